//! Software and tag extraction phase.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::parse::{heuristic_tags, merge_tags, parse_json};
use super::{capped_transcript, metadata_for, prompt, InferenceContext, PhaseExecutor};
use crate::core::{
    ErrorRecord, InfoExtraction, Phase, PhaseOutput, ResultUpdate, SoftwareMention, StateRecord,
};
use crate::source::MediaItem;

#[derive(Debug, Default, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    software: Vec<SoftwareMention>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    additional_tags: Vec<String>,
}

/// Extracts software mentions and new tags, merged after the item's
/// existing tags.
///
/// This phase always completes. When inference fails outright the result
/// keeps the existing tags, has no software, and carries an `error`; when
/// the response is not valid JSON, emphasized terms in the text are used
/// as tags instead.
#[derive(Debug, Clone)]
pub struct ExtractInfo {
    ctx: InferenceContext,
}

impl ExtractInfo {
    /// Creates the executor.
    #[must_use]
    pub const fn new(ctx: InferenceContext) -> Self {
        Self { ctx }
    }

    /// Runs the extraction and returns the result with any non-fatal errors.
    pub async fn extract(
        &self,
        state: &StateRecord,
        item: &MediaItem,
    ) -> (InfoExtraction, Vec<ErrorRecord>) {
        let phase = Phase::ExtractInfo;
        let metadata = metadata_for(state, item);
        let existing = item.existing_tags();
        let transcript = capped_transcript(item, &self.ctx.limits);
        let prompt = prompt::info_prompt(&metadata, &existing, &transcript, &self.ctx.limits);

        let completion = match self.ctx.complete(phase, prompt).await {
            Ok(completion) => completion,
            Err(error) => {
                warn!(
                    item_id = %state.item_id(),
                    error = %error,
                    "Info extraction failed; keeping existing tags"
                );
                let result = InfoExtraction {
                    software: Vec::new(),
                    tags: existing,
                    error: Some(error.message.clone()),
                };
                return (result, vec![error]);
            }
        };

        match parse_json::<InfoResponse>(&completion.content) {
            Ok(response) => {
                let new_tags = merge_tags(&response.tags, &response.additional_tags);
                let tags = merge_tags(&existing, &new_tags);
                info!(
                    item_id = %state.item_id(),
                    software = response.software.len(),
                    existing_tags = existing.len(),
                    added_tags = tags.len() - existing.len(),
                    "Extracted software and tags"
                );
                let result = InfoExtraction {
                    software: response.software,
                    tags,
                    error: None,
                };
                (result, Vec::new())
            }
            Err(e) => {
                let message = format!("Failed to parse info response: {e}");
                let recovered = heuristic_tags(&completion.content);
                warn!(
                    item_id = %state.item_id(),
                    error = %e,
                    recovered = recovered.len(),
                    "Info response was not valid JSON; using emphasis fallback"
                );
                let result = InfoExtraction {
                    software: Vec::new(),
                    tags: merge_tags(&existing, &recovered),
                    error: Some(message.clone()),
                };
                (result, vec![ErrorRecord::new(phase.as_str(), message, 0)])
            }
        }
    }
}

#[async_trait]
impl PhaseExecutor for ExtractInfo {
    fn phase(&self) -> Phase {
        Phase::ExtractInfo
    }

    async fn execute(&self, state: &StateRecord, item: &MediaItem) -> PhaseOutput {
        let (result, errors) = self.extract(state, item).await;
        errors.into_iter().fold(
            PhaseOutput::complete_with(ResultUpdate::Info(result)),
            PhaseOutput::with_error,
        )
    }
}
