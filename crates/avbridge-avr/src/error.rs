//! Link error types.

use thiserror::Error;

/// Errors from the receiver connection.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not connected to receiver")]
    NotConnected,

    #[error("Link task is gone")]
    ChannelClosed,
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
