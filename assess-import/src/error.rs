//! Error types for assess-import
//!
//! `ImportError` is what the engine returns; `ApiError` is its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::ValidationResult;

/// Failure of an execute call
#[derive(Debug, Error)]
pub enum ImportError {
    /// Re-validation found structural errors; nothing was written
    #[error("Import rejected: {} validation error(s)", .0.errors.len())]
    Rejected(Box<ValidationResult>),

    /// The transaction failed and was rolled back; nothing was written
    #[error("Import failed: {0}")]
    Failed(String),

    /// Failure before any write (catalog or settings lookup)
    #[error(transparent)]
    Common(#[from] assess_common::Error),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Payload failed re-validation (422), carries the fresh report
    #[error("Import rejected")]
    Rejected(Box<ValidationResult>),

    /// Import transaction rolled back (500)
    #[error("Import failed: {0}")]
    ImportFailed(String),

    /// assess-common error
    #[error("Common error: {0}")]
    Common(#[from] assess_common::Error),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Rejected(result) => ApiError::Rejected(result),
            ImportError::Failed(msg) => ApiError::ImportFailed(msg),
            ImportError::Common(assess_common::Error::NotFound(msg)) => ApiError::NotFound(msg),
            ImportError::Common(assess_common::Error::InvalidInput(msg)) => ApiError::BadRequest(msg),
            ImportError::Common(e) => ApiError::Common(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Rejected(result) => {
                let body = Json(json!({
                    "error": {
                        "code": "VALIDATION_FAILED",
                        "message": result.errors.join("; "),
                    },
                    "validation": result,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            ApiError::ImportFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "IMPORT_FAILED", msg)
            }
            ApiError::Common(assess_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
