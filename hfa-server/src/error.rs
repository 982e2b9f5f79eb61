//! HTTP error mapping for hfa-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid session (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Uniqueness violation (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Error from the shared domain/store layer
    #[error(transparent)]
    Common(#[from] hfa_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, field) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Conflict(msg) => {
                // Uniqueness violations should be impossible with upsert
                // writes; log loudly rather than swallowing them.
                error!("conflict surfaced to client: {}", msg);
                (StatusCode::CONFLICT, "CONFLICT", msg, None)
            }
            ApiError::Internal(msg) => {
                error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    None,
                )
            }
            ApiError::Common(err) => return common_error_response(err),
        };

        error_body(status, error_code, message, field)
    }
}

/// Map the shared error taxonomy onto HTTP statuses. Store errors are
/// logged with their detail but surface generically; query text never
/// reaches the client.
fn common_error_response(err: hfa_common::Error) -> Response {
    use hfa_common::Error;

    match err {
        Error::Validation { field, message } => error_body(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            message,
            Some(field),
        ),
        Error::NotFound(_) => error_body(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Not found".to_string(),
            None,
        ),
        Error::Conflict(msg) => {
            error!("store conflict: {}", msg);
            error_body(
                StatusCode::CONFLICT,
                "CONFLICT",
                "Conflict".to_string(),
                None,
            )
        }
        Error::Database(e) => {
            error!("database error: {}", e);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                "Store error".to_string(),
                None,
            )
        }
        Error::Io(e) => {
            error!("io error: {}", e);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            )
        }
        Error::Config(msg) | Error::Internal(msg) => {
            error!("internal error: {}", msg);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            )
        }
    }
}

fn error_body(
    status: StatusCode,
    code: &str,
    message: String,
    field: Option<String>,
) -> Response {
    let mut error = json!({
        "code": code,
        "message": message,
    });
    if let Some(field) = field {
        error["field"] = json!(field);
    }

    (status, Json(json!({ "error": error }))).into_response()
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
