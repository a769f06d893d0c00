//! Price list import pipeline
//!
//! An uploaded archive flows through four stages:
//!
//! 1. [`archive::locate`] finds the table file inside the ZIP payload
//! 2. [`parser::parse`] splits it into records and finds where data starts
//! 3. [`validator::validate`] turns each record into a [`crate::models::PriceRow`] or skips it
//! 4. [`pipeline::IngestPipeline`] inserts accepted rows in one transaction
//!    and builds the [`crate::models::Summary`]

pub mod archive;
pub mod layout;
pub mod parser;
pub mod pipeline;
pub mod validator;

pub use layout::{ColumnLayout, DateFormats, HeaderDetection};
pub use parser::ParsedTable;
pub use pipeline::{IngestPipeline, IngestSettings, InsertFailurePolicy, EmptyBatchPolicy};

use crate::db::StoreError;

/// Reasons an import call is rejected as a whole
///
/// Bad individual records are not errors; they are skipped.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Unreadable input: {0}")]
    Format(String),
    #[error("No table file found in archive (expected one of: {expected})")]
    NotFound { expected: String },
    #[error("Table file contains no records")]
    EmptyInput,
    #[error("No valid rows to insert")]
    NoValidRows,
    #[error("Database error: {0}")]
    Database(#[from] StoreError),
}
