//! Conversation history management.
//!
//! This module provides per-user conversation history with automatic
//! trimming to a bounded number of turns. The system prompt is never stored
//! here; brains inject it fresh on every request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Default number of turns (individual messages) kept per user.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Author of the turn.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Base64 images sent with the turn, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ConversationTurn {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Create a user turn carrying images.
    pub fn user_with_images(content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images,
        }
    }

    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images: Vec::new(),
        }
    }
}

/// Per-user conversation history.
///
/// Each user gets an ordered list of turns, most recent last. Only a
/// completed exchange (user turn plus assistant turn) is ever appended, and
/// the oldest turns are dropped once the list exceeds `max_turns`. Entries
/// live until [`clear`](Self::clear) or [`clear_all`](Self::clear_all).
///
/// # Example
///
/// ```rust
/// use brain_core::{ConversationHistory, ConversationTurn};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let history = ConversationHistory::new(20);
///
///     history.add_exchange("u1", ConversationTurn::user("Hello"), "Hi there!").await;
///     history.add_exchange("u1", ConversationTurn::user("How are you?"), "Doing well!").await;
///
///     let turns = history.get("u1").await;
///     assert_eq!(turns.len(), 4);
/// }
/// ```
#[derive(Debug)]
pub struct ConversationHistory {
    /// Map from user identity to their turns.
    histories: RwLock<HashMap<String, Vec<ConversationTurn>>>,
    /// Maximum number of turns (individual messages) to keep per user.
    max_turns: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl ConversationHistory {
    /// Create a new conversation history keeping at most `max_turns` messages per user.
    pub fn new(max_turns: usize) -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    /// Maximum number of turns kept per user.
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Get the conversation history for a user, oldest first.
    pub async fn get(&self, user: &str) -> Vec<ConversationTurn> {
        let histories = self.histories.read().await;
        histories.get(user).cloned().unwrap_or_default()
    }

    /// Number of turns currently stored for a user.
    pub async fn len(&self, user: &str) -> usize {
        let histories = self.histories.read().await;
        histories.get(user).map(Vec::len).unwrap_or(0)
    }

    /// Whether a user has no stored turns.
    pub async fn is_empty(&self, user: &str) -> bool {
        self.len(user).await == 0
    }

    /// Append a completed exchange and trim to the most recent `max_turns`.
    pub async fn add_exchange(&self, user: &str, user_turn: ConversationTurn, assistant_msg: &str) {
        let mut histories = self.histories.write().await;
        let history = histories.entry(user.to_string()).or_default();

        history.push(user_turn);
        history.push(ConversationTurn::assistant(assistant_msg));

        if history.len() > self.max_turns {
            let to_remove = history.len() - self.max_turns;
            history.drain(0..to_remove);
        }
    }

    /// Clear history for a specific user.
    pub async fn clear(&self, user: &str) {
        let mut histories = self.histories.write().await;
        histories.remove(user);
    }

    /// Clear all conversation histories.
    pub async fn clear_all(&self) {
        let mut histories = self.histories.write().await;
        histories.clear();
    }

    /// Get the current number of tracked users.
    pub async fn user_count(&self) -> usize {
        let histories = self.histories.read().await;
        histories.len()
    }
}
