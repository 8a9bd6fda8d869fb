//! Domain models for the heritage media catalog.
//!
//! Catalog entities are immutable once fetched from the remote source and are
//! never mutated locally. Ids are server-assigned strings wrapped in validated
//! newtypes.

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Maximum accepted length for a catalog id.
const MAX_ID_LEN: usize = 128;

fn validate_id(kind: &str, raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(CatalogError::InvalidRequest {
            field: kind.to_string(),
            message: "id must not be empty".to_string(),
        });
    }
    if raw.len() > MAX_ID_LEN {
        return Err(CatalogError::InvalidRequest {
            field: kind.to_string(),
            message: format!("id exceeds {} characters", MAX_ID_LEN),
        });
    }
    // Ids double as local file names; restrict to a safe slug alphabet.
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        || raw.starts_with('.')
    {
        return Err(CatalogError::InvalidRequest {
            field: kind.to_string(),
            message: "id may only contain alphanumerics, '-', '_' and '.'".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// ID Types
// ============================================================================

/// Stable catalog identifier for a content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Create a content id from a server-assigned string.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidRequest` for empty ids, over-long ids, or
    /// ids containing whitespace/control characters.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate_id("content_id", &raw)?;
        Ok(Self(raw))
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable catalog identifier for a performer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformerId(String);

impl PerformerId {
    /// Create a performer id from a server-assigned string.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidRequest` for malformed ids.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate_id("performer_id", &raw)?;
        Ok(Self(raw))
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PerformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Catalog Entities
// ============================================================================

/// Kind of playable media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Audio,
}

impl ContentKind {
    /// String representation for persistence and wire formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "video" => Ok(ContentKind::Video),
            "audio" => Ok(ContentKind::Audio),
            _ => Err(CatalogError::Decode(format!("Unknown content kind: {}", s))),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single playable media unit (performance recording) in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Stable catalog identifier
    pub id: ContentId,
    /// Display title
    pub title: String,
    /// Optional long-form description
    pub description: Option<String>,
    /// Video or audio
    pub kind: ContentKind,
    /// URL of the original media file (the download source)
    pub media_url: String,
    /// HLS manifest URL for streaming, if the item has been processed
    pub hls_url: Option<String>,
    /// Audio-only rendition URL, if available
    pub audio_url: Option<String>,
    /// Thumbnail image URL
    pub thumbnail_url: Option<String>,
    /// Duration in seconds
    pub duration_secs: u32,
    /// Size of the original file in bytes, when the backend reports it
    pub file_size: Option<u64>,
    /// Number of catalog views
    pub view_count: u64,
    /// Number of completed downloads recorded by the backend
    pub download_count: u64,
    /// The performer this recording belongs to
    pub performer_id: PerformerId,
    /// Display name of the performer, when embedded in the response
    pub performer_name: Option<String>,
    /// Category tags
    pub categories: BTreeSet<String>,
    /// Publish timestamp (Unix epoch milliseconds)
    pub published_at: i64,
}

impl ContentItem {
    /// The URL a streaming player should use: HLS when processed, then the
    /// audio rendition, falling back to the original file.
    pub fn streaming_url(&self) -> &str {
        match self.kind {
            ContentKind::Video => self
                .hls_url
                .as_deref()
                .unwrap_or(&self.media_url),
            ContentKind::Audio => self
                .audio_url
                .as_deref()
                .or(self.hls_url.as_deref())
                .unwrap_or(&self.media_url),
        }
    }
}

/// An entity associated with one or more content items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performer {
    /// Stable catalog identifier
    pub id: PerformerId,
    /// Display name
    pub name: String,
    /// Biography text
    pub bio: Option<String>,
    /// Portrait image URL
    pub image_url: Option<String>,
    /// Free-form location string
    pub location: Option<String>,
    /// Number of content items attributed to this performer
    pub content_count: u64,
}

/// A browsable catalog category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub content_count: u64,
}

// ============================================================================
// Query Types
// ============================================================================

/// Page/limit pair for paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    /// Maximum items per page
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}
