//! Remote fetch errors.

use thiserror::Error;

/// Errors loading a remote include.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request or status failure.
    #[error("http fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Reading a local include failed.
    #[error("file read failed: {0}")]
    Io(#[from] std::io::Error),
    /// The cache was created outside a Tokio runtime.
    #[error("remote cache requires a tokio runtime")]
    NoRuntime,
}

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
