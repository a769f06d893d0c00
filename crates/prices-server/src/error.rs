//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::export::ExportError;
use crate::ingest::IngestError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Request body is empty")]
    EmptyBody,

    #[error("Multipart upload must include a 'file' field")]
    FileRequired,

    #[error("Upload exceeds the configured size limit")]
    PayloadTooLarge,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::EmptyBody | AppError::FileRequired | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            },
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Ingest(IngestError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Ingest(_) => StatusCode::BAD_REQUEST,
            AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::EmptyBody => "EMPTY_BODY",
            AppError::FileRequired => "FILE_REQUIRED",
            AppError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Ingest(IngestError::Format(_)) => "FORMAT_ERROR",
            AppError::Ingest(IngestError::NotFound { .. }) => "TABLE_NOT_FOUND",
            AppError::Ingest(IngestError::EmptyInput) => "EMPTY_INPUT",
            AppError::Ingest(IngestError::NoValidRows) => "NO_VALID_ROWS",
            AppError::Ingest(IngestError::Database(_)) | AppError::Export(ExportError::Database(_)) => {
                "DATABASE_ERROR"
            },
            AppError::Export(_) => "EXPORT_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            AppError::Ingest(IngestError::Database(ref e))
            | AppError::Export(ExportError::Database(ref e)) => {
                tracing::error!("Database error: {:?}", e);
                ErrorResponse::new(code, "A database error occurred")
            },
            AppError::Export(ref e) => {
                tracing::error!("Export failed: {}", e);
                ErrorResponse::new(code, "Failed to build export archive")
            },
            AppError::Ingest(IngestError::NotFound { ref expected }) => {
                ErrorResponse::with_details(code, self.to_string(), json!({ "expected": expected }))
            },
            ref other => {
                tracing::debug!(code, "Request rejected: {}", other);
                ErrorResponse::new(code, other.to_string())
            },
        };

        body.into_response_with(status)
    }
}
