//! Process summarization phase.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::parse::parse_json;
use super::{capped_transcript, metadata_for, prompt, InferenceContext, PhaseExecutor};
use crate::core::{ErrorRecord, Phase, PhaseOutput, ResultUpdate, StateRecord};
use crate::source::MediaItem;

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
}

/// Summarizes what the item teaches, using the processes extracted earlier.
///
/// A response that is not valid JSON is kept verbatim as the summary.
#[derive(Debug, Clone)]
pub struct Summarize {
    ctx: InferenceContext,
}

impl Summarize {
    /// Creates the executor.
    #[must_use]
    pub const fn new(ctx: InferenceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl PhaseExecutor for Summarize {
    fn phase(&self) -> Phase {
        Phase::Summarize
    }

    async fn execute(&self, state: &StateRecord, item: &MediaItem) -> PhaseOutput {
        let metadata = metadata_for(state, item);
        let transcript = capped_transcript(item, &self.ctx.limits);
        let prompt = prompt::summary_prompt(
            &metadata,
            &state.interim_results.processes,
            &transcript,
            &self.ctx.limits,
        );

        let completion = match self.ctx.complete(self.phase(), prompt).await {
            Ok(completion) => completion,
            Err(error) => return PhaseOutput::failed(error),
        };

        match parse_json::<SummaryResponse>(&completion.content) {
            Ok(response) => {
                info!(
                    item_id = %state.item_id(),
                    summary_chars = response.summary.chars().count(),
                    "Summarized processes"
                );
                PhaseOutput::complete_with(ResultUpdate::Summary(response.summary))
            }
            Err(e) => {
                warn!(
                    item_id = %state.item_id(),
                    error = %e,
                    "Summary response was not valid JSON; keeping raw text"
                );
                PhaseOutput::complete_with(ResultUpdate::Summary(
                    completion.content.trim().to_string(),
                ))
                .with_error(ErrorRecord::new(
                    self.phase().as_str(),
                    format!("Failed to parse summary response: {e}"),
                    0,
                ))
            }
        }
    }
}
