//! Common error types.

use thiserror::Error;

/// Main error type for the dispatch layer.
///
/// Every failure is terminal for the request it occurred in and is delivered
/// through the same callback or return channel as a success. Nothing here is
/// retried automatically.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The session configuration was torn down before a deferred step ran.
    #[error("Session released before the request could run")]
    SessionReleased,

    /// URL resolution failed before dispatch; the transport is never touched.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying transport reported a network-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Status validation failed or the response carried no payload.
    #[error("Invalid response")]
    InvalidResponse,

    /// The response JSON did not match the target type.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
