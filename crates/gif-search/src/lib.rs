//! GIF Search - reaction media search that always answers.
//!
//! [`GifFallbackChain`] runs on the same [`brain_core::FallbackChain`] as the
//! chat path: Giphy direct, then each configured proxy route, each under its
//! own timeout, and finally [`LocalGifGenerator`], which cannot fail.
//!
//! # Example
//!
//! ```rust,no_run
//! use gif_search::{GifFallbackChain, MediaKind};
//!
//! # async fn example() -> Result<(), gif_search::GifError> {
//! let chain = GifFallbackChain::from_env()?;
//! let result = chain.search(Some("happy dance"), 10, MediaKind::Gifs).await;
//! println!("{} results from {}", result.data.len(), result.meta.msg);
//! # Ok(())
//! # }
//! ```

mod chain;
mod config;
mod error;
mod local;
mod normalize;
mod source;
mod types;

pub use chain::GifFallbackChain;
pub use config::{GifSearchConfig, Route, DEFAULT_API_URL};
pub use error::GifError;
pub use local::{LocalGifGenerator, LOCAL_RESULT_COUNT};
pub use normalize::normalize_payload;
pub use source::GiphySource;
pub use types::{
    GifImages, GifItem, GifMeta, GifQuery, GifRendition, GifResultSet, MediaKind, MAX_LIMIT,
};
