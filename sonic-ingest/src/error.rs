//! Error types for sonic-ingest
//!
//! Two families live here:
//! - `ApiError`: plain HTTP request failures, rendered as JSON bodies
//! - `ImportError`: conditions that end an import session with an `error`
//!   progress event
//!
//! Per-source failures (`SourceError`) live with the adapters and are only
//! turned into an `ImportError` once every source has been exhausted.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Longest upstream message surfaced to a client
pub const MAX_SURFACED_MESSAGE: usize = 200;

/// Truncate an upstream message for display, on a char boundary
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    let trimmed = message.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => trimmed[..idx].to_string(),
        None => trimmed.to_string(),
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Requested byte range cannot be served (416)
    #[error("Range not satisfiable for {0} bytes")]
    RangeNotSatisfiable(usize),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// sonic-common error
    #[error("Common error: {0}")]
    Common(#[from] sonic_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::RangeNotSatisfiable(total) => {
                let body = Json(json!({
                    "error": {
                        "code": "RANGE_NOT_SATISFIABLE",
                        "message": format!("Requested range not satisfiable ({} bytes available)", total),
                    }
                }));
                return (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(axum::http::header::CONTENT_RANGE, format!("bytes */{}", total))],
                    body,
                )
                    .into_response();
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(sonic_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
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

/// Conditions that terminate an import session
///
/// The `Display` text is what the client sees in the `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// Unrecognized playlist reference; the user must fix the input
    #[error("{0}")]
    Validation(String),

    /// Missing or unusable credentials; the operator must fix the setup
    #[error("{0}")]
    Configuration(String),

    /// Every source exhausted, or the fallback tool itself failed
    #[error("{0}")]
    Fatal(String),
}
