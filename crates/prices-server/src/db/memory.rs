//! In-process price store
//!
//! Mirrors the transactional contract of [`super::PgPriceStore`]: rows written
//! through a batch become visible only on commit, and ids are assigned in
//! commit order. Product ids are kept only when the [`SchemaVariant`]
//! stores them. Failure switches let tests exercise the error paths.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Mutex;

use super::{PriceBatch, PriceStore, SchemaVariant, StoreError};
use crate::models::{PriceRow, StoredPrice};

#[derive(Debug, Default)]
struct Tables {
    rows: Vec<StoredPrice>,
    next_id: i64,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Mutex<Tables>,
    schema: SchemaVariant,
    rejected_names: HashSet<String>,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_reads: AtomicBool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPriceStore {
    inner: Arc<Inner>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(schema: SchemaVariant) -> Self {
        Self {
            inner: Arc::new(Inner {
                schema,
                ..Inner::default()
            }),
        }
    }

    /// Inserts of rows with one of these names fail, like a constraint violation
    pub fn with_rejected_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(Inner {
                rejected_names: names.into_iter().map(Into::into).collect(),
                ..Inner::default()
            }),
        }
    }

    pub fn fail_begin(&self, fail: bool) {
        self.inner.fail_begin.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commit(&self, fail: bool) {
        self.inner.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.inner.tables.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn begin(&self) -> Result<Box<dyn PriceBatch>, StoreError> {
        if self.inner.fail_begin.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cannot open transaction".to_string()));
        }
        Ok(Box::new(MemoryPriceBatch {
            inner: Arc::clone(&self.inner),
            pending: Vec::new(),
        }))
    }

    async fn fetch_all(&self) -> Result<Vec<StoredPrice>, StoreError> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cannot read prices".to_string()));
        }
        let tables = self.inner.tables.lock().await;
        let mut rows = tables.rows.clone();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }
}

struct MemoryPriceBatch {
    inner: Arc<Inner>,
    pending: Vec<PriceRow>,
}

#[async_trait]
impl PriceBatch for MemoryPriceBatch {
    async fn insert(&mut self, row: &PriceRow) -> Result<(), StoreError> {
        if self.inner.rejected_names.contains(&row.name) {
            return Err(StoreError::Rejected(format!("name '{}' violates constraint", row.name)));
        }
        self.pending.push(row.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.inner.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }
        let mut tables = self.inner.tables.lock().await;
        let keep_product_id = self.inner.schema.store_product_id;
        for mut row in self.pending {
            if !keep_product_id {
                row.product_id = None;
            }
            tables.next_id += 1;
            let id = tables.next_id;
            tables.rows.push(StoredPrice::from_row(id, row));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
