//! Error types for orchestrator operations.

use brain_core::BrainError;
use thiserror::Error;

/// Errors that can occur during orchestration.
///
/// None of these reach callers of
/// [`Orchestrator::generate_response`](crate::Orchestrator::generate_response);
/// they are logged and turned into a user-safe reply.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Brain processing failed.
    #[error("brain error: {0}")]
    Brain(#[from] BrainError),

    /// Invalid settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Handing the response to its sink failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}
