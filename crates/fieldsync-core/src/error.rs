//! Error types for fieldsync.

use thiserror::Error;

/// Result type alias using fieldsync's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fieldsync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream forms API call failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// External list wire format violation
    #[error("List format error: {0}")]
    ListFormat(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}

impl Error {
    /// True when the underlying cause is a unique-constraint violation.
    ///
    /// Natural-key collisions on insert are expected during reprocessing of
    /// re-delivered submissions and are treated as success-with-no-op by
    /// callers.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}
