//! Prices Server Library
//!
//! HTTP service that imports price lists from ZIP archives into PostgreSQL
//! and exports the stored rows the same way.
//!
//! # Overview
//!
//! - **Ingest**: archive lookup, CSV parsing, per-record validation and a
//!   single transactional batch insert ([`ingest`])
//! - **Export**: id-ordered CSV wrapped in a one-entry ZIP ([`export`])
//! - **Storage**: the [`db::PriceStore`] capability with PostgreSQL and
//!   in-memory implementations
//! - **API**: `POST`/`GET /api/v0/prices` and `GET /health` ([`api`])
//!
//! # Example
//!
//! ```no_run
//! use prices_server::{api, config::Config, db};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::postgres::connect(&config.database).await?;
//!     let store = db::PgPriceStore::new(pool, config.pipeline.schema);
//!     store.ensure_schema().await?;
//!     let app = api::create_router(Arc::new(store), &config);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;

// Re-export commonly used types
pub use error::AppError;
