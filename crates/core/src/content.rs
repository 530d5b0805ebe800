//! Content catalog item model.
//!
//! [`ContentArtifact`] is what a finished generation job produces and what
//! the catalog stores. Once merged, an artifact is owned by the catalog and
//! is independent of the job record it came from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ContentId, Timestamp};

/// Tag attached to every synthetic artifact.
pub const SYNTHETIC_TAG: &str = "ai-generated";

/// Media kind of a generation request or catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Music,
}

impl ContentKind {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Music => "music",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(ContentKind::Video),
            "music" => Ok(ContentKind::Music),
            other => Err(CoreError::Validation(format!(
                "Unknown content kind '{other}'. Must be one of: video, music"
            ))),
        }
    }
}

/// A finished content item, either seeded or produced by a generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentArtifact {
    /// Freshly minted id, never equal to the originating job id.
    pub id: ContentId,
    pub title: String,
    pub description: String,
    pub thumbnail_uri: String,
    pub duration_secs: u32,
    pub kind: ContentKind,
    /// For synthetic items this is the job's style.
    pub genre: String,
    pub is_synthetic: bool,
    pub media_uri: String,
    pub views: u64,
    pub likes: u64,
    pub tags: Vec<String>,
    pub created_at: Timestamp,
}

impl ContentArtifact {
    /// Whether any tag equals `tag`, ignoring ASCII case.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
