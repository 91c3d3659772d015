//! Core trait and types shared by the assistant gateway crates.
//!
//! This crate defines:
//!
//! - [`Brain`] - The trait that every response backend implements
//! - [`InboundMessage`] / [`OutboundMessage`] - Message types for input/output
//! - [`BrainError`] - Error types for brain operations
//! - [`ConversationHistory`] - Bounded per-user conversation context
//! - [`FallbackChain`] - Ordered fallback with per-source deadlines
//!
//! # Example
//!
//! ```rust
//! use brain_core::{Brain, BrainError, InboundMessage, OutboundMessage};
//! use async_trait::async_trait;
//!
//! struct MyBrain;
//!
//! #[async_trait]
//! impl Brain for MyBrain {
//!     async fn process(&self, message: InboundMessage) -> Result<OutboundMessage, BrainError> {
//!         Ok(OutboundMessage::reply_to(&message, "Hello!"))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "MyBrain"
//!     }
//! }
//! ```

mod error;
mod fallback;
mod history;
mod message;
mod prompt;
mod trait_def;

pub use error::BrainError;
pub use fallback::{
    FallbackChain, FallbackOutcome, FallbackSource, SourceError, SourceFailure, TerminalSource,
};
pub use history::{ConversationHistory, ConversationTurn, Role, DEFAULT_MAX_TURNS};
pub use message::{InboundMessage, OutboundMessage};
pub use prompt::hash_prompt;
pub use trait_def::Brain;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
