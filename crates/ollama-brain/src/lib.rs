//! Ollama-backed brain implementation.
//!
//! This crate provides a brain that talks to a local Ollama model server,
//! the primary backend of the gateway.
//!
//! # Features
//!
//! - Per-user conversation context, bounded to the most recent turns
//! - Multimodal requests (base64 images on the user turn)
//! - TTL-cached health checks via `GET /api/tags` ([`HealthMonitor`])
//! - Long, explicit request deadlines; no internal retries
//! - Configurable via environment variables
//!
//! # Usage
//!
//! ```rust,no_run
//! use ollama_brain::{Brain, InboundMessage, OllamaBrain};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let brain = OllamaBrain::from_env()?;
//!     if brain.is_ready().await {
//!         let reply = brain.process(InboundMessage::direct("u1", "Hello!", 0)).await?;
//!         println!("{}", reply.text);
//!     }
//!     Ok(())
//! }
//! ```

mod api_types;
mod brain;
mod config;
mod health;

pub use brain::{DispatchOptions, OllamaBrain};
pub use config::{
    OllamaBrainConfig, OllamaBrainConfigBuilder, DEFAULT_API_URL, DEFAULT_MODEL,
    DEFAULT_PROMPT_FILE, DEFAULT_SYSTEM_PROMPT,
};
pub use health::{BackendProbe, HealthMonitor, HealthSnapshot, TagsProbe};

// Re-export brain-core types for convenience
pub use brain_core::{
    async_trait, Brain, BrainError, ConversationHistory, ConversationTurn, InboundMessage,
    OutboundMessage,
};
