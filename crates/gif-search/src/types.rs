//! Query and result types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest page size a caller may request.
pub const MAX_LIMIT: u32 = 50;

/// Which Giphy catalogue to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Gifs,
    Stickers,
}

impl MediaKind {
    /// Parse `gifs`/`gif` or `stickers`/`sticker`, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gifs" | "gif" => Some(Self::Gifs),
            "stickers" | "sticker" => Some(Self::Stickers),
            _ => None,
        }
    }

    /// Path segment used by the Giphy API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gifs => "gifs",
            Self::Stickers => "stickers",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifQuery {
    /// Search terms; `None` means trending.
    pub query: Option<String>,
    /// Page size, always within `1..=MAX_LIMIT`.
    pub limit: u32,
    pub kind: MediaKind,
}

impl GifQuery {
    /// Build a query. Blank terms become trending and `limit` is clamped.
    pub fn new(query: Option<&str>, limit: u32, kind: MediaKind) -> Self {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        Self {
            query,
            limit: limit.clamp(1, MAX_LIMIT),
            kind,
        }
    }

    pub fn is_trending(&self) -> bool {
        self.query.is_none()
    }

    /// The search terms, or `"trending"`.
    pub fn label(&self) -> &str {
        self.query.as_deref().unwrap_or("trending")
    }
}

/// One size of a GIF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifRendition {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifImages {
    pub fixed_height: GifRendition,
    pub original: GifRendition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifItem {
    pub id: String,
    pub title: String,
    pub images: GifImages,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifMeta {
    /// Name of the source that served the results.
    pub msg: String,
}

/// Search response in the Giphy-compatible shape `{data, meta}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifResultSet {
    pub data: Vec<GifItem>,
    pub meta: GifMeta,
}
