//! Phase executors.
//!
//! Every phase implements [`PhaseExecutor`]: it reads the state record and
//! the item input and returns a [`PhaseOutput`] describing what to merge.
//! Executors never mutate the record themselves and never return errors;
//! remote failures are absorbed by the retry policy and expressed as
//! error records.

mod compile;
mod info;
mod initialize;
pub mod parse;
mod processes;
pub mod prompt;
mod summarize;

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::PromptLimits;
use crate::core::{ErrorRecord, Phase, PhaseOutput, StateRecord};
use crate::inference::{Completion, CompletionRequest, InferenceClient};
use crate::pipeline::{retry, RetryPolicy};
use crate::source::MediaItem;

pub use compile::CompileOutput;
pub use info::ExtractInfo;
pub use initialize::Initialize;
pub use processes::ExtractProcesses;
pub use summarize::Summarize;

/// One unit of work in the pipeline.
#[async_trait]
pub trait PhaseExecutor: Send + Sync + fmt::Debug {
    /// The phase this executor implements.
    fn phase(&self) -> Phase;

    /// Runs the phase against the current record and item input.
    async fn execute(&self, state: &StateRecord, item: &MediaItem) -> PhaseOutput;
}

/// Inference collaborators shared by the model-backed phases.
#[derive(Clone)]
pub struct InferenceContext {
    /// Backend used for completions.
    pub client: Arc<dyn InferenceClient>,
    /// Retry policy wrapped around every completion.
    pub retry: RetryPolicy,
    /// Prompt bounds.
    pub limits: PromptLimits,
    /// Sampling temperature.
    pub temperature: f32,
}

impl fmt::Debug for InferenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceContext")
            .field("client", &self.client.name())
            .field("retry", &self.retry)
            .field("limits", &self.limits)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl InferenceContext {
    /// Creates a context with default limits, retry policy, and temperature.
    #[must_use]
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            limits: PromptLimits::default(),
            temperature: 0.1,
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the prompt limits.
    #[must_use]
    pub fn with_limits(mut self, limits: PromptLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Requests a JSON completion under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns the error record of the last attempt once retries are exhausted.
    pub async fn complete(&self, phase: Phase, prompt: String) -> Result<Completion, ErrorRecord> {
        let request = CompletionRequest::json(prompt, self.temperature);
        debug!(
            phase = %phase,
            backend = self.client.name(),
            prompt_chars = request.prompt.len(),
            "Requesting completion"
        );
        retry(&self.retry, phase.as_str(), || self.client.complete(&request)).await
    }
}

/// The standard executor for every phase.
#[must_use]
pub fn default_executors(
    ctx: &InferenceContext,
    output_dir: impl Into<PathBuf>,
) -> Vec<Arc<dyn PhaseExecutor>> {
    vec![
        Arc::new(Initialize::new()),
        Arc::new(ExtractProcesses::new(ctx.clone())),
        Arc::new(Summarize::new(ctx.clone())),
        Arc::new(ExtractInfo::new(ctx.clone())),
        Arc::new(CompileOutput::new(output_dir)),
    ]
}

/// Transcript text capped by the context's limits.
fn capped_transcript(item: &MediaItem, limits: &PromptLimits) -> String {
    prompt::transcript_text(&item.transcript, limits)
}

/// Metadata normalized by `initialize`, or normalized on the fly if that
/// phase has not written it.
fn metadata_for(state: &StateRecord, item: &MediaItem) -> crate::core::NormalizedMetadata {
    state
        .interim_results
        .metadata
        .clone()
        .unwrap_or_else(|| initialize::normalize(&item.metadata))
}
