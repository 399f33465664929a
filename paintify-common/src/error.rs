//! Common error types for Paintify

use thiserror::Error;

/// Common result type for Paintify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Paintify crates
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

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists (unique constraint)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the underlying cause is a UNIQUE constraint violation.
    ///
    /// Two concurrent submissions of the same payload can both pass the
    /// existence check before either inserts; the loser surfaces here and
    /// callers treat it the same as "already existed".
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            Error::Conflict(_) => true,
            _ => false,
        }
    }
}
