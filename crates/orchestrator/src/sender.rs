//! Response sink trait and implementations.

use async_trait::async_trait;

use crate::error::OrchestratorError;

/// Receives the final reply for a user.
///
/// Abstracted to support different transports (HTTP, WebSocket, tests, etc.)
#[async_trait]
pub trait ResponseSink: Send + Sync {
    /// Deliver a markdown-capable reply to `user_id`.
    async fn send_response(&self, user_id: &str, text: &str) -> Result<(), OrchestratorError>;
}

/// A no-op sink for testing that discards all responses.
#[derive(Debug, Clone, Default)]
pub struct NoOpSink;

#[async_trait]
impl ResponseSink for NoOpSink {
    async fn send_response(&self, _user_id: &str, _text: &str) -> Result<(), OrchestratorError> {
        Ok(())
    }
}

/// A logging sink for debugging that logs every response.
#[derive(Debug, Clone, Default)]
pub struct LoggingSink;

#[async_trait]
impl ResponseSink for LoggingSink {
    async fn send_response(&self, user_id: &str, text: &str) -> Result<(), OrchestratorError> {
        tracing::info!("Sending response to {} ({} chars): {}", user_id, text.len(), text);
        Ok(())
    }
}

/// Prints each reply to stdout followed by a blank line.
#[derive(Debug, Clone, Default)]
pub struct StdoutSink;

#[async_trait]
impl ResponseSink for StdoutSink {
    async fn send_response(&self, _user_id: &str, text: &str) -> Result<(), OrchestratorError> {
        println!("{}\n", text);
        Ok(())
    }
}
