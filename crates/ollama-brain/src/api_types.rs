//! Ollama API request and response types.

use brain_core::ConversationTurn;
use serde::{Deserialize, Serialize};

/// A chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
    /// Base64-encoded images for multimodal models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            images: None,
        }
    }

    /// Create a user message, embedding images when there are any.
    pub fn user(content: impl Into<String>, images: &[String]) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            images: if images.is_empty() {
                None
            } else {
                Some(images.to_vec())
            },
        }
    }
}

impl From<ConversationTurn> for ChatMessage {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content,
            images: if turn.images.is_empty() {
                None
            } else {
                Some(turn.images)
            },
        }
    }
}

/// Generation options.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Chat request to `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to use
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<ChatMessage>,
    /// Always false: we want a single JSON reply
    pub stream: bool,
    /// Generation options
    pub options: ChatOptions,
}

/// Chat response from `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Model used
    #[serde(default)]
    pub model: Option<String>,
    /// The assistant message
    pub message: ResponseMessage,
    /// Whether generation finished
    #[serde(default)]
    pub done: bool,
    /// Prompt tokens evaluated
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Tokens generated
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// Assistant message in a chat response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// Role
    #[serde(default)]
    pub role: String,
    /// Content
    #[serde(default)]
    pub content: String,
}

/// Response from `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    /// Locally available models
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// A locally available model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    /// Model name including tag, e.g. "llama3.2:1b"
    pub name: String,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error message
    pub error: String,
}
