//! Metadata normalization phase.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::PhaseExecutor;
use crate::core::{NormalizedMetadata, Phase, PhaseOutput, ResultUpdate, StateRecord};
use crate::source::{ItemMetadata, MediaItem};

/// Normalizes the raw video and channel mappings. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialize;

impl Initialize {
    /// Creates the executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn text(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Counts arrive as numbers or as decimal strings depending on the source.
fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Maps the source's field names onto [`NormalizedMetadata`].
pub(crate) fn normalize(raw: &ItemMetadata) -> NormalizedMetadata {
    let video = &raw.video;
    let channel = &raw.channel;

    NormalizedMetadata {
        title: text(video, "title"),
        description: text(video, "description"),
        publish_date: text(video, "publishedAt"),
        view_count: count(video.get("views")),
        like_count: count(video.get("likes")),
        comment_count: count(
            video
                .get("comments")
                .and_then(Value::as_object)
                .and_then(|c| c.get("commentCount")),
        ),
        channel_id: text(channel, "id"),
        channel_name: text(channel, "title"),
        subscriber_count: count(channel.get("subscriberCount")),
        thumbnail_path: text(video, "thumbnail"),
        tags: video
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[async_trait]
impl PhaseExecutor for Initialize {
    fn phase(&self) -> Phase {
        Phase::Initialize
    }

    async fn execute(&self, state: &StateRecord, item: &MediaItem) -> PhaseOutput {
        let metadata = normalize(&item.metadata);
        debug!(
            item_id = %state.item_id(),
            title = %metadata.title,
            segments = item.transcript.len(),
            existing_tags = metadata.tags.len(),
            "Normalized item metadata"
        );
        PhaseOutput::complete_with(ResultUpdate::Metadata(metadata))
    }
}
