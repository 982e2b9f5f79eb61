//! Common error types for the academy membership service

use thiserror::Error;

/// Common result type for membership operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the domain layer, the store adapters and the
/// HTTP surface.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or missing request field; carries the offending field name
    #[error("Invalid field {field}: {message}")]
    Validation { field: String, message: String },

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation on identity, academy code or ledger tuple.
    /// Never swallowed: the idempotent-upsert design makes this rare, so
    /// any occurrence indicates store corruption or a derivation collision.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a required-field failure
    pub fn required(field: &str) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: "required".to_string(),
        }
    }
}
