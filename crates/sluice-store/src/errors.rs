//! Storage error types.

use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Manifest or property (de)serialization failure.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The backend refused the write (used by test doubles).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
