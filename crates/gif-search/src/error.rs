//! Error types for building GIF sources.

use thiserror::Error;

/// Errors raised while assembling the search chain. Searches themselves never fail.
#[derive(Debug, Error)]
pub enum GifError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
