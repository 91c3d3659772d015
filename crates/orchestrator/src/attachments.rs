//! Attachment ingestion.
//!
//! An attachment reference (a URL or bare identifier) is reduced to a file
//! name and looked up in an ordered list of directories. Images are base64
//! encoded for multimodal models; text files are inlined between markers.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

/// Largest amount of text inlined from one file.
pub const MAX_INLINE_TEXT_BYTES: usize = 100 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "csv", "json", "log", "xml", "yaml", "yml", "html", "htm", "js",
    "ts", "py", "rs", "toml",
];

/// Why an attachment could not be ingested. Never fatal to a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("attachment reference has no usable file name: {0}")]
    InvalidReference(String),

    #[error("attachment not found in any candidate directory: {0}")]
    NotFound(String),

    #[error("failed to read attachment {0}: {1}")]
    Read(String, String),
}

/// How a file is treated, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Text,
    Unsupported,
}

impl AttachmentKind {
    pub fn from_file_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some(e) if IMAGE_EXTENSIONS.contains(&e) => Self::Image,
            Some(e) if TEXT_EXTENSIONS.contains(&e) => Self::Text,
            _ => Self::Unsupported,
        }
    }
}

/// Result of ingesting one attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestedAttachment {
    /// Base64-encoded images.
    pub images: Vec<String>,
    /// File content wrapped in attachment markers.
    pub inlined_text: Option<String>,
}

impl IngestedAttachment {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.inlined_text.is_none()
    }
}

/// Resolves attachment references against candidate directories.
#[derive(Debug, Clone)]
pub struct AttachmentIngestor {
    dirs: Vec<PathBuf>,
    max_text_bytes: usize,
}

impl AttachmentIngestor {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            max_text_bytes: MAX_INLINE_TEXT_BYTES,
        }
    }

    /// Override the inline text cap.
    pub fn with_max_text_bytes(mut self, max: usize) -> Self {
        self.max_text_bytes = max;
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Ingest `reference`, returning an empty result on any failure.
    pub async fn resolve(&self, reference: &str) -> IngestedAttachment {
        match self.try_resolve(reference).await {
            Ok(ingested) => ingested,
            Err(e) => {
                warn!("Ignoring attachment: {}", e);
                IngestedAttachment::default()
            }
        }
    }

    /// Ingest `reference`, reporting why it could not be used.
    pub async fn try_resolve(
        &self,
        reference: &str,
    ) -> Result<IngestedAttachment, AttachmentError> {
        let name = file_name_from_reference(reference)
            .ok_or_else(|| AttachmentError::InvalidReference(reference.to_string()))?;

        let kind = AttachmentKind::from_file_name(&name);
        if kind == AttachmentKind::Unsupported {
            debug!("Attachment {} has an unsupported extension, skipping", name);
            return Ok(IngestedAttachment::default());
        }

        let path = self
            .locate(&name)
            .await
            .ok_or_else(|| AttachmentError::NotFound(name.clone()))?;

        let bytes = fs::read(&path)
            .await
            .map_err(|e| AttachmentError::Read(name.clone(), e.to_string()))?;

        info!("Ingested attachment {} ({} bytes, {:?})", name, bytes.len(), kind);

        Ok(match kind {
            AttachmentKind::Image => IngestedAttachment {
                images: vec![STANDARD.encode(&bytes)],
                inlined_text: None,
            },
            AttachmentKind::Text => IngestedAttachment {
                images: Vec::new(),
                inlined_text: Some(wrap_text(&name, &bytes, self.max_text_bytes)),
            },
            AttachmentKind::Unsupported => IngestedAttachment::default(),
        })
    }

    async fn locate(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.dirs {
            let candidate = dir.join(name);
            if fs::metadata(&candidate)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
            {
                return Some(candidate);
            }
        }
        None
    }
}

/// Reduce a URL or identifier to a bare, percent-decoded file name.
///
/// Query strings and fragments are dropped and no directory component
/// survives, so the result can be joined onto a directory safely.
pub fn file_name_from_reference(reference: &str) -> Option<String> {
    let without_query = reference
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default()
        .trim();

    let decoded = urlencoding::decode(without_query)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| without_query.to_string());

    let name = decoded
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return None;
    }
    Some(name.to_string())
}

fn wrap_text(name: &str, bytes: &[u8], max_bytes: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let (content, truncated) = truncate_on_char_boundary(&text, max_bytes);

    let mut out = format!("--- Attached file: {} ---\n", name);
    out.push_str(content);
    if truncated {
        out.push_str("\n[... truncated ...]");
    }
    out.push_str("\n--- End of attached file ---");
    out
}

fn truncate_on_char_boundary(text: &str, max_bytes: usize) -> (&str, bool) {
    if text.len() <= max_bytes {
        return (text, false);
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (&text[..end], true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_reference() {
        assert_eq!(
            file_name_from_reference("https://host/uploads/notes.txt?token=abc#top").as_deref(),
            Some("notes.txt")
        );
        assert_eq!(
            file_name_from_reference("/uploads/my%20photo.PNG").as_deref(),
            Some("my photo.PNG")
        );
        assert_eq!(
            file_name_from_reference("..%2F..%2Fetc%2Fpasswd").as_deref(),
            Some("passwd")
        );
        assert_eq!(file_name_from_reference("C:\\files\\a.md").as_deref(), Some("a.md"));
        assert_eq!(file_name_from_reference("https://host/dir/"), None);
        assert_eq!(file_name_from_reference("../.."), None);
        assert_eq!(file_name_from_reference(""), None);
    }

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(AttachmentKind::from_file_name("a.JPG"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_file_name("a.rs"), AttachmentKind::Text);
        assert_eq!(AttachmentKind::from_file_name("a.exe"), AttachmentKind::Unsupported);
        assert_eq!(AttachmentKind::from_file_name("README"), AttachmentKind::Unsupported);
    }

    #[tokio::test]
    async fn test_image_is_base64_encoded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cat.png"), b"\x89PNG").unwrap();
        let ingestor = AttachmentIngestor::new(vec![dir.path().to_path_buf()]);

        let ingested = ingestor.resolve("/uploads/cat.png?v=1").await;
        assert_eq!(ingested.images, vec![STANDARD.encode(b"\x89PNG")]);
        assert!(ingested.inlined_text.is_none());
    }

    #[tokio::test]
    async fn test_text_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "# Notes\nremember milk").unwrap();
        let ingestor = AttachmentIngestor::new(vec![dir.path().to_path_buf()]);

        let text = ingestor.resolve("notes.md").await.inlined_text.unwrap();
        assert_eq!(
            text,
            "--- Attached file: notes.md ---\n# Notes\nremember milk\n--- End of attached file ---"
        );
    }

    #[tokio::test]
    async fn test_directories_searched_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("a.txt"), "second").unwrap();
        let ingestor = AttachmentIngestor::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert!(ingestor.resolve("a.txt").await.inlined_text.unwrap().contains("second"));

        std::fs::write(first.path().join("a.txt"), "first").unwrap();
        assert!(ingestor.resolve("a.txt").await.inlined_text.unwrap().contains("first"));
    }

    #[tokio::test]
    async fn test_file_outside_listed_dirs_is_not_found() {
        let listed = tempfile::tempdir().unwrap();
        let unlisted = tempfile::tempdir().unwrap();
        std::fs::write(unlisted.path().join("secret.png"), b"png").unwrap();
        let ingestor = AttachmentIngestor::new(vec![listed.path().to_path_buf()]);

        let reference = unlisted.path().join("secret.png");
        let reference = reference.to_string_lossy();
        assert_eq!(
            ingestor.try_resolve(&reference).await,
            Err(AttachmentError::NotFound("secret.png".into()))
        );
        assert!(ingestor.resolve(&reference).await.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tool.exe"), b"MZ").unwrap();
        let ingestor = AttachmentIngestor::new(vec![dir.path().to_path_buf()]);
        assert!(ingestor.try_resolve("tool.exe").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_text_truncated_on_char_boundary() {
        let dir = tempfile::tempdir().unwrap();
        // Each 'é' is two bytes, so a 5-byte cap must stop after two of them.
        std::fs::write(dir.path().join("long.txt"), "ééééé").unwrap();
        let ingestor =
            AttachmentIngestor::new(vec![dir.path().to_path_buf()]).with_max_text_bytes(5);

        let text = ingestor.resolve("long.txt").await.inlined_text.unwrap();
        assert!(text.contains("\néé\n[... truncated ...]"));
    }
}
