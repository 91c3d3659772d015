//! Inbound and outbound message types.

use serde::{Deserialize, Serialize};

/// A message from a user, ready to be answered by a brain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// User identity as provided by the authentication layer.
    pub sender: String,
    /// Message text, possibly augmented with inlined attachment content.
    pub text: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Base64-encoded images for multimodal models.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl InboundMessage {
    /// Create a text-only message.
    pub fn direct(sender: impl Into<String>, text: impl Into<String>, timestamp: u64) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp,
            images: Vec::new(),
        }
    }

    /// Attach base64-encoded images to the message.
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Whether the message carries any images.
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// A reply produced by a brain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// User identity the reply is addressed to.
    pub recipient: String,
    /// Reply text (markdown allowed).
    pub text: String,
}

impl OutboundMessage {
    /// Create a reply addressed to the sender of `message`.
    pub fn reply_to(message: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            recipient: message.sender.clone(),
            text: text.into(),
        }
    }

    /// Create a message for an explicit recipient.
    pub fn new(recipient: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            text: text.into(),
        }
    }
}
