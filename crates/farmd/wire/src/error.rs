//! Wire error types.

use thiserror::Error;

/// Wire error type.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Wire result type.
pub type Result<T> = std::result::Result<T, WireError>;
