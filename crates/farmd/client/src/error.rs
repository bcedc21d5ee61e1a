//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("wire error: {0}")]
    Wire(#[from] farmd_wire::WireError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("not connected")]
    NotConnected,

    #[error("request canceled: {0}")]
    Canceled(String),
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
