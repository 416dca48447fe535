//! Process extraction phase.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::parse::{heuristic_list_items, parse_json};
use super::{capped_transcript, metadata_for, prompt, InferenceContext, PhaseExecutor};
use crate::core::{ErrorRecord, Phase, PhaseOutput, Process, ResultUpdate, StateRecord};
use crate::source::MediaItem;

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    processes: Vec<Process>,
}

/// Asks the model for the processes demonstrated in the item.
///
/// Fails the phase only when retries are exhausted. A response that is not
/// valid JSON falls back to the list entries found in the text.
#[derive(Debug, Clone)]
pub struct ExtractProcesses {
    ctx: InferenceContext,
}

impl ExtractProcesses {
    /// Creates the executor.
    #[must_use]
    pub const fn new(ctx: InferenceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl PhaseExecutor for ExtractProcesses {
    fn phase(&self) -> Phase {
        Phase::ExtractProcesses
    }

    async fn execute(&self, state: &StateRecord, item: &MediaItem) -> PhaseOutput {
        let metadata = metadata_for(state, item);
        let transcript = capped_transcript(item, &self.ctx.limits);
        let prompt = prompt::process_prompt(&metadata, &transcript, &self.ctx.limits);

        let completion = match self.ctx.complete(self.phase(), prompt).await {
            Ok(completion) => completion,
            Err(error) => return PhaseOutput::failed(error),
        };

        match parse_json::<ProcessResponse>(&completion.content) {
            Ok(response) => {
                info!(
                    item_id = %state.item_id(),
                    processes = response.processes.len(),
                    "Extracted processes"
                );
                PhaseOutput::complete_with(ResultUpdate::Processes(response.processes))
            }
            Err(e) => {
                let processes: Vec<Process> = heuristic_list_items(&completion.content)
                    .into_iter()
                    .map(Process::named)
                    .collect();
                warn!(
                    item_id = %state.item_id(),
                    error = %e,
                    recovered = processes.len(),
                    "Process response was not valid JSON; using list fallback"
                );
                PhaseOutput::complete_with(ResultUpdate::Processes(processes)).with_error(
                    ErrorRecord::new(
                        self.phase().as_str(),
                        format!("Failed to parse process response: {e}"),
                        0,
                    ),
                )
            }
        }
    }
}
