//! Result value types produced by the phases.

use serde::{Deserialize, Serialize};

/// A piece of software mentioned in the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareMention {
    /// Product name.
    pub name: String,
    /// What it is and how it is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of mentions counted by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentions: Option<u32>,
    /// Any other fields the model returned.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SoftwareMention {
    /// Creates a mention with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            mentions: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Sets the mention count.
    #[must_use]
    pub const fn with_mentions(mut self, mentions: u32) -> Self {
        self.mentions = Some(mentions);
        self
    }
}

/// A process or workflow demonstrated in the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Short process name.
    pub name: String,
    /// What the process achieves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    /// Any other fields the model returned.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Process {
    /// Creates a process with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Item metadata normalized from the raw video and channel mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizedMetadata {
    /// Item title.
    pub title: String,
    /// Item description as published.
    pub description: String,
    /// Publish date, in whatever format the source used.
    pub publish_date: String,
    /// View count, zero when unknown.
    pub view_count: u64,
    /// Like count, zero when unknown.
    pub like_count: u64,
    /// Comment count, zero when unknown.
    pub comment_count: u64,
    /// Owning channel identifier.
    pub channel_id: String,
    /// Owning channel display name.
    pub channel_name: String,
    /// Channel subscriber count, zero when unknown.
    pub subscriber_count: u64,
    /// Local path of the downloaded thumbnail.
    pub thumbnail_path: String,
    /// Tags already attached to the item by its publisher.
    pub tags: Vec<String>,
}

/// Output of the information extraction phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoExtraction {
    /// Software mentioned in the item.
    pub software: Vec<SoftwareMention>,
    /// Existing tags followed by newly extracted ones.
    pub tags: Vec<String>,
    /// Set when inference or parsing failed and a fallback was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The compiled per-item result written by the terminal phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Normalized item metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NormalizedMetadata>,
    /// Software mentioned in the item.
    #[serde(default)]
    pub software: Vec<SoftwareMention>,
    /// Merged tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Extracted processes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<Process>,
    /// Process summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Extraction error message, if a fallback was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
