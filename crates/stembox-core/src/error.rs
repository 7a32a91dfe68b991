//! Error types for StemBox.

use thiserror::Error;

/// Main error type for StemBox operations.
#[derive(Error, Debug)]
pub enum StemBoxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("load error: {0}")]
    Load(String),

    #[error("load timed out after {0} ms")]
    LoadTimeout(u64),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("audio backend error: {0}")]
    Backend(String),

    #[error("handle operation failed: {0}")]
    Operation(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for StemBox operations.
pub type Result<T> = std::result::Result<T, StemBoxError>;
