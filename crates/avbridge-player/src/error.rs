//! Player bus error types.

use thiserror::Error;

/// Errors from the player bus connection.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for player bus operations.
pub type BusResult<T> = Result<T, BusError>;
