//! PostgreSQL price store

use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::{postgres::PgPoolOptions, Acquire, PgPool, Postgres, Transaction};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::{DateColumn, PriceBatch, PriceStore, SchemaVariant, StoreError};
use crate::config::DatabaseConfig;
use crate::models::{PriceRow, StoredPrice};

/// Number of connectivity checks before startup gives up
pub const CONNECT_ATTEMPTS: u32 = 10;

/// Delay between connectivity checks
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Build the connection pool and wait until the database answers
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_lazy(&config.url)?;

    for attempt in 1..=CONNECT_ATTEMPTS {
        match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => {
                info!(attempt, "Database connection pool established");
                return Ok(pool);
            },
            Err(e) => {
                warn!(attempt, error = %e, "Database not reachable yet");
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            },
        }
    }

    anyhow::bail!("Database connection failed after {} attempts", CONNECT_ATTEMPTS)
}

/// [`PriceStore`] backed by a `prices` table in PostgreSQL
#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
    variant: SchemaVariant,
    insert_sql: Arc<str>,
    select_sql: Arc<str>,
}

impl PgPriceStore {
    pub fn new(pool: PgPool, variant: SchemaVariant) -> Self {
        Self {
            pool,
            variant,
            insert_sql: variant.insert_sql().into(),
            select_sql: variant.select_all_sql().into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `prices` table for the active variant if it is missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(&self.variant.create_table_sql())
            .execute(&self.pool)
            .await?;
        debug!(variant = ?self.variant, "prices table ready");
        Ok(())
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn begin(&self) -> Result<Box<dyn PriceBatch>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgPriceBatch {
            tx,
            variant: self.variant,
            insert_sql: Arc::clone(&self.insert_sql),
        }))
    }

    async fn fetch_all(&self) -> Result<Vec<StoredPrice>, StoreError> {
        let rows = sqlx::query_as::<_, StoredPrice>(&self.select_sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One import transaction
///
/// Every insert runs inside its own savepoint: PostgreSQL aborts the whole
/// transaction on a failed statement otherwise, and the remaining rows of the
/// batch could never be written.
struct PgPriceBatch {
    tx: Transaction<'static, Postgres>,
    variant: SchemaVariant,
    insert_sql: Arc<str>,
}

#[async_trait]
impl PriceBatch for PgPriceBatch {
    async fn insert(&mut self, row: &PriceRow) -> Result<(), StoreError> {
        let mut savepoint = (&mut self.tx).begin().await?;

        let mut query = sqlx::query(&self.insert_sql);
        if self.variant.store_product_id {
            query = query.bind(row.product_id);
        }
        query = query
            .bind(row.name.as_str())
            .bind(row.category.as_str())
            .bind(row.price.clone());
        query = match self.variant.date_column {
            DateColumn::Date => query.bind(row.create_date),
            DateColumn::Timestamp => query.bind(row.create_date.and_time(NaiveTime::MIN)),
        };

        match query.execute(&mut *savepoint).await {
            Ok(_) => {
                savepoint.commit().await?;
                Ok(())
            },
            Err(e) => {
                savepoint.rollback().await?;
                Err(StoreError::Database(e))
            },
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
