//! Context builder for attachment content gathered before dispatch.

use brain_core::InboundMessage;

use crate::attachments::IngestedAttachment;

/// Attachment content gathered for one request.
///
/// This is used to augment the user's message with inlined files and images
/// before passing it to a brain.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inlined_texts: Vec<String>,
    images: Vec<String>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ingested attachment to the context.
    pub fn add_attachment(&mut self, attachment: IngestedAttachment) {
        self.inlined_texts.extend(attachment.inlined_text);
        self.images.extend(attachment.images);
    }

    /// Check if the context has anything to add.
    pub fn has_content(&self) -> bool {
        !self.inlined_texts.is_empty() || !self.images.is_empty()
    }

    /// Number of images gathered.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Create an augmented message with the context appended.
    ///
    /// Inlined files follow the user's text, separated by a blank line;
    /// images are added after any the message already carries.
    pub fn augment_message(&self, original: &InboundMessage) -> InboundMessage {
        if !self.has_content() {
            return original.clone();
        }

        let mut text = original.text.clone();
        for inlined in &self.inlined_texts {
            text.push_str("\n\n");
            text.push_str(inlined);
        }

        let mut images = original.images.clone();
        images.extend(self.images.iter().cloned());

        InboundMessage {
            sender: original.sender.clone(),
            text,
            timestamp: original.timestamp,
            images,
        }
    }

    /// Format the context as a string for logging/debugging.
    pub fn format_summary(&self) -> String {
        if !self.has_content() {
            return "No attachment context".to_string();
        }
        format!(
            "{} inlined file(s), {} image(s)",
            self.inlined_texts.len(),
            self.images.len()
        )
    }
}
