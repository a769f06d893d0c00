pub mod response;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::db::PriceStore;
use crate::features;
use crate::middleware;

/// Application state shared across top-level handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PriceStore>,
}

/// Build the application router with all routes and middleware
pub fn create_router(store: Arc<dyn PriceStore>, config: &Config) -> Router {
    let feature_state =
        features::FeatureState::new(Arc::clone(&store), config.pipeline.ingest);
    let api_v0 = features::router(feature_state);

    Router::new()
        .route("/health", get(health_check))
        .with_state(AppState { store })
        .nest("/api/v0", api_v0)
        // Apply layers from innermost to outermost
        .layer(DefaultBodyLimit::max(config.pipeline.max_upload_bytes))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    match state.store.ping().await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}
