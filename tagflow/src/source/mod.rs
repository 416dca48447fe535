//! Transcript and metadata input for a single item.
//!
//! Fetching from the remote data source happens outside this crate; the
//! pipeline only needs "given an item identifier, return a transcript and a
//! metadata mapping", which is what [`MediaSource`] expresses.

mod dump;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::SourceError;

pub use dump::JsonDumpSource;

/// One timed segment of a transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Spoken text.
    #[serde(default)]
    pub text: String,
    /// Start offset in seconds.
    #[serde(default)]
    pub start: f64,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: f64,
}

impl TranscriptSegment {
    /// A segment with text only.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Raw metadata mappings as returned by the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Video fields (`title`, `description`, `tags`, `publishedAt`, ...).
    #[serde(default)]
    pub video: serde_json::Map<String, serde_json::Value>,
    /// Channel fields (`id`, `title`, `subscriberCount`, ...).
    #[serde(default)]
    pub channel: serde_json::Map<String, serde_json::Value>,
}

/// Transcript plus metadata for one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Ordered transcript segments.
    #[serde(default)]
    pub transcript: Vec<TranscriptSegment>,
    /// Video and channel metadata.
    #[serde(default, alias = "video_info")]
    pub metadata: ItemMetadata,
}

impl MediaItem {
    /// Creates an item.
    #[must_use]
    pub fn new(transcript: Vec<TranscriptSegment>, metadata: ItemMetadata) -> Self {
        Self { transcript, metadata }
    }

    /// Tags the publisher already attached to the video.
    ///
    /// Non-string entries are ignored.
    #[must_use]
    pub fn existing_tags(&self) -> Vec<String> {
        self.metadata
            .video
            .get("tags")
            .and_then(serde_json::Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Supplier of item input data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Returns the transcript and metadata for `item_id`.
    async fn fetch(&self, item_id: &str) -> Result<MediaItem, SourceError>;
}
