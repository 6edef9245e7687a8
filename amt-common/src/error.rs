//! Common error types for AMT

use thiserror::Error;

/// Common result type for AMT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across AMT services
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

    /// A referenced entity (asset, location, status, master record) does not exist
    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    /// More than one active placement exists for an asset
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Malformed input rejected before any write
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row duplicates data that already exists as specified
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable code for error reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::Database(_) => "DATABASE_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::ReferenceNotFound(_) => "REFERENCE_NOT_FOUND",
            Error::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Duplicate(_) => "DUPLICATE",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
