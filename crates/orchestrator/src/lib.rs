//! Response orchestrator for the assistant gateway.
//!
//! This crate provides the [`Orchestrator`] type, the single entry point that
//! turns `(user id, message, optional attachment)` into a markdown reply.
//!
//! # Features
//!
//! - Detects image-generation requests and answers them from a local render cache
//! - Inlines text attachments and forwards image attachments to multimodal models
//! - Dispatches chat to the primary model while its health check passes
//! - Falls back to deterministic rule-based replies when it does not
//! - Never surfaces an error to the caller
//!
//! # Architecture
//!
//! ```text
//! (user id, message, attachment?)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Image intent? ── yes ──→ PromptEnhancer → ImageCache    │
//! │         │ no                        ↓                       │
//! │         ↓                     markdown image reply          │
//! │  2. Ingest attachment (AttachmentIngestor)                  │
//! │         ↓                                                   │
//! │  3. FallbackChain:                                          │
//! │     • primary (health-gated OllamaBrain)                    │
//! │     • PatternMatcher (cannot fail)                          │
//! │         ↓                                                   │
//! │  4. Reply (or fixed apology when fallback is disabled)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use orchestrator::{LoggingSink, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::from_env()?;
//!
//!     let reply = orchestrator.generate_response("user-1", "hello!", None).await;
//!     println!("Response: {}", reply);
//!
//!     orchestrator
//!         .deliver("user-1", "draw a lighthouse at dusk", None, &LoggingSink)
//!         .await?;
//!     Ok(())
//! }
//! ```

mod attachments;
mod config;
mod context;
mod error;
mod formatting;
mod orchestrator;
mod sender;

// Public exports
pub use attachments::{
    file_name_from_reference, AttachmentError, AttachmentIngestor, AttachmentKind,
    IngestedAttachment, MAX_INLINE_TEXT_BYTES,
};
pub use config::{
    OrchestratorConfig, DEFAULT_ATTACHMENT_DIR, DEFAULT_IMAGE_CACHE_DIR,
    DEFAULT_IMAGE_PUBLIC_PREFIX, DEFAULT_RENDER_URL,
};
pub use context::Context;
pub use error::OrchestratorError;
pub use formatting::{format_cached_image, format_remote_image, public_image_url};
pub use orchestrator::{GenerationStage, Orchestrator, ResponseRoute, APOLOGY_TEXT};
pub use sender::{LoggingSink, NoOpSink, ResponseSink, StdoutSink};

// Re-export commonly used types from dependencies
pub use brain_core::{InboundMessage, OutboundMessage};
pub use image_gen::SeedStrategy;
pub use ollama_brain::{OllamaBrain, OllamaBrainConfig};
pub use pattern_brain::{PatternMatcher, RulePattern};
