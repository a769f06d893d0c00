//! Storage access for price rows
//!
//! The import and export pipelines never touch a connection pool directly.
//! They receive a [`PriceStore`] capability, which hands out a [`PriceBatch`]
//! (one atomic transaction) for writes and reads every stored row for export.
//!
//! - [`postgres::PgPriceStore`]: production store on PostgreSQL via SQLx
//! - [`memory::MemoryPriceStore`]: in-process store for tests and local runs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{PriceRow, StoredPrice};

pub mod memory;
pub mod postgres;

pub use memory::MemoryPriceStore;
pub use postgres::PgPriceStore;

/// Storage-level failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Row rejected by store: {0}")]
    Rejected(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Column type used for `create_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateColumn {
    #[default]
    Date,
    Timestamp,
}

impl DateColumn {
    fn sql_type(self) -> &'static str {
        match self {
            DateColumn::Date => "DATE",
            DateColumn::Timestamp => "TIMESTAMP",
        }
    }
}

impl std::str::FromStr for DateColumn {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(DateColumn::Date),
            "timestamp" | "datetime" => Ok(DateColumn::Timestamp),
            _ => Err(anyhow::anyhow!("Invalid date column type: {}", s)),
        }
    }
}

/// Deployment-wide layout of the `prices` table
///
/// Exactly one variant is active per deployment; import and export both
/// read it from the same configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaVariant {
    pub store_product_id: bool,
    pub date_column: DateColumn,
}

impl SchemaVariant {
    pub const TABLE: &'static str = "prices";

    pub fn create_table_sql(&self) -> String {
        let product_id = if self.store_product_id {
            "\n    product_id BIGINT,"
        } else {
            ""
        };
        format!(
            r#"CREATE TABLE IF NOT EXISTS {table} (
    id BIGSERIAL PRIMARY KEY,{product_id}
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    price DECIMAL(10, 2) NOT NULL,
    create_date {date_type} NOT NULL
)"#,
            table = Self::TABLE,
            date_type = self.date_column.sql_type(),
        )
    }

    pub fn insert_sql(&self) -> String {
        if self.store_product_id {
            format!(
                "INSERT INTO {} (product_id, name, category, price, create_date) VALUES ($1, $2, $3, $4, $5)",
                Self::TABLE
            )
        } else {
            format!(
                "INSERT INTO {} (name, category, price, create_date) VALUES ($1, $2, $3, $4)",
                Self::TABLE
            )
        }
    }

    pub fn select_all_sql(&self) -> String {
        let product_id = if self.store_product_id {
            "product_id"
        } else {
            "NULL::BIGINT AS product_id"
        };
        format!(
            "SELECT id, {product_id}, name, category, price, create_date::DATE AS create_date \
             FROM {table} ORDER BY id ASC",
            table = Self::TABLE,
        )
    }
}

/// Capability over the relational store used by the pipelines
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Open one atomic transaction for a batch of inserts
    async fn begin(&self) -> Result<Box<dyn PriceBatch>, StoreError>;

    /// All stored rows ordered by ascending id
    async fn fetch_all(&self) -> Result<Vec<StoredPrice>, StoreError>;

    /// Cheap connectivity check for health probes
    async fn ping(&self) -> Result<(), StoreError>;
}

/// An open transaction; dropping it without [`PriceBatch::commit`] rolls back
#[async_trait]
pub trait PriceBatch: Send {
    /// Insert one row. A failure only affects this row; the batch stays usable.
    async fn insert(&mut self, row: &PriceRow) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_variant_sql() {
        let variant = SchemaVariant::default();
        let ddl = variant.create_table_sql();
        assert!(ddl.contains("create_date DATE NOT NULL"));
        assert!(!ddl.contains("product_id"));
        assert!(variant.insert_sql().ends_with("VALUES ($1, $2, $3, $4)"));
        assert!(variant.select_all_sql().contains("NULL::BIGINT AS product_id"));
        assert!(variant.select_all_sql().ends_with("ORDER BY id ASC"));
    }

    #[test]
    fn test_product_id_timestamp_variant_sql() {
        let variant = SchemaVariant {
            store_product_id: true,
            date_column: DateColumn::Timestamp,
        };
        let ddl = variant.create_table_sql();
        assert!(ddl.contains("product_id BIGINT,"));
        assert!(ddl.contains("create_date TIMESTAMP NOT NULL"));
        assert!(variant.insert_sql().contains("(product_id, name, category, price, create_date)"));
        assert!(variant.select_all_sql().starts_with("SELECT id, product_id,"));
    }

    #[test]
    fn test_date_column_from_str() {
        assert_eq!("DATE".parse::<DateColumn>().unwrap(), DateColumn::Date);
        assert_eq!("timestamp".parse::<DateColumn>().unwrap(), DateColumn::Timestamp);
        assert!("time".parse::<DateColumn>().is_err());
    }
}
