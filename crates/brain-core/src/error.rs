//! Error types for brain operations.

use thiserror::Error;

/// Errors that can occur while a brain processes a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrainError {
    /// The backend could not be reached (connection refused, DNS, health probe failed).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered, but with a non-2xx status or a payload we could not read.
    #[error("backend protocol error: {0}")]
    Protocol(String),

    /// The request did not complete within its deadline.
    #[error("backend timed out after {0} ms")]
    Timeout(u64),

    /// The brain was constructed with invalid settings.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BrainError {
    /// Whether the error means the backend is down, as opposed to misbehaving.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}
