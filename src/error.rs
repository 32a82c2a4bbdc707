//! Error types for the relay.

use crate::types::ListenerId;
use thiserror::Error;

/// Main error type for relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("content too long: {len} characters (max {max})")]
    ContentTooLong { len: usize, max: usize },

    #[error("listener not found: {0}")]
    ListenerNotFound(ListenerId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
