use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::{
    commands::{ImportPricesCommand, ImportPricesError},
    queries::ExportPricesQuery,
};
use crate::error::AppError;
use crate::features::FeatureState;

/// Multipart field that carries the archive
pub const UPLOAD_FIELD: &str = "file";

pub fn prices_routes() -> Router<FeatureState> {
    Router::new().route("/prices", post(import_prices).get(export_prices))
}

/// Archive bytes from either a raw body or a multipart `file` field
#[derive(Debug)]
pub struct ArchiveUpload(pub Vec<u8>);

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
}

fn body_error(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(message)
    }
}

#[async_trait]
impl<S> FromRequest<S> for ArchiveUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            return Ok(Self(body.to_vec()));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| body_error(e.status(), e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| body_error(e.status(), e.body_text()))?
        {
            if field.name() == Some(UPLOAD_FIELD) {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| body_error(e.status(), e.body_text()))?;
                return Ok(Self(data.to_vec()));
            }
        }

        Err(AppError::FileRequired)
    }
}

#[tracing::instrument(skip(state, upload), fields(bytes = upload.0.len()))]
async fn import_prices(
    State(state): State<FeatureState>,
    upload: ArchiveUpload,
) -> Result<Response, AppError> {
    let command = ImportPricesCommand { content: upload.0 };

    let summary = super::commands::import::handle(&state.pipeline, command).await?;

    tracing::info!(
        total_items = summary.total_items,
        total_categories = summary.total_categories,
        "Prices imported via API"
    );

    Ok((StatusCode::OK, Json(summary)).into_response())
}

#[tracing::instrument(skip(state))]
async fn export_prices(State(state): State<FeatureState>) -> Result<Response, AppError> {
    let query = ExportPricesQuery {
        layout: state.pipeline.settings().layout,
    };

    let response = super::queries::export::handle(state.store.as_ref(), query).await?;

    tracing::debug!(rows = response.rows, bytes = response.archive.len(), "Prices exported via API");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", response.filename),
            ),
        ],
        response.archive,
    )
        .into_response())
}

impl From<ImportPricesError> for AppError {
    fn from(err: ImportPricesError) -> Self {
        match err {
            ImportPricesError::ContentRequired => AppError::EmptyBody,
            ImportPricesError::Ingest(e) => AppError::Ingest(e),
        }
    }
}
