//! Image Gen - turns "draw ..." messages into rendered, locally cached images.
//!
//! - [`PromptEnhancer`] detects image intent and engineers the render prompt
//! - [`GenerationRequest`] carries the prompt pair, resolution and seed, and
//!   builds the render provider URL
//! - [`ImageCache`] downloads each unique prompt once and serves it from disk
//!   afterwards
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use image_gen::{ImageCache, PromptEnhancer};
//!
//! # async fn example() -> Result<(), image_gen::ImageError> {
//! let enhancer = PromptEnhancer::default();
//! let cache = ImageCache::new("generated-images", Duration::from_secs(120));
//!
//! if let Some(request) = enhancer.detect_image_intent("draw a sunset over mountains") {
//!     let url = request.render_url("https://image.pollinations.ai/prompt")?;
//!     let image = cache.fetch_or_create(url.as_str(), &request.raw_prompt).await?;
//!     println!("cached at {}", image.local_path.display());
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod enhancer;
mod error;

pub use cache::{CachedImage, ImageCache, DEFAULT_DOWNLOAD_TIMEOUT};
pub use enhancer::{
    Composition, CulturalContext, GenerationRequest, PromptEnhancer, SeedStrategy,
};
pub use error::ImageError;
