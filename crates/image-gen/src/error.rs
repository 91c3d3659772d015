//! Error types for image generation.

use thiserror::Error;

/// Errors from fetching or caching a rendered image.
///
/// Variants carry plain strings so the error can be shared between callers
/// waiting on the same download.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The render provider could not be reached, answered non-2xx, or timed out.
    #[error("image download failed: {0}")]
    Download(String),

    /// The image could not be written to the cache directory.
    #[error("image cache write failed: {0}")]
    CacheWrite(String),

    /// The render URL could not be built.
    #[error("invalid render URL: {0}")]
    InvalidUrl(String),
}

impl From<url::ParseError> for ImageError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
