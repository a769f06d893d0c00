//! Feature modules implementing the prices API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes. Commands change stored state; queries only read it.
//!
//! - **prices**: archive import (`POST /prices`) and export (`GET /prices`)

pub mod prices;

use axum::Router;
use std::sync::Arc;

use crate::db::PriceStore;
use crate::ingest::IngestPipeline;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Storage capability used by export queries
    pub store: Arc<dyn PriceStore>,
    /// Import pipeline bound to the same store and the deployment settings
    pub pipeline: IngestPipeline,
}

impl FeatureState {
    pub fn new(store: Arc<dyn PriceStore>, settings: crate::ingest::IngestSettings) -> Self {
        Self {
            pipeline: IngestPipeline::new(Arc::clone(&store), settings),
            store,
        }
    }
}

/// Creates the API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().merge(prices::prices_routes().with_state(state))
}
