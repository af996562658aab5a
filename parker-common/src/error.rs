//! Common error types for Parker

use thiserror::Error;

/// Common result type for Parker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the library and the server
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error for structured columns
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings catalog failed validation
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Stored setting value does not match its declared type
    #[error("Setting '{key}' holds {value:?}, which is not a valid {data_type} value")]
    Cast {
        key: String,
        data_type: String,
        value: String,
    },

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
