//! The resumable pipeline engine.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::transition::{next_phase, NextPhase};
use super::{retry, RetryPolicy};
use crate::core::{ErrorRecord, ExtractionResult, Phase, PhaseOutput, PhaseStatus, StateRecord};
use crate::errors::{Result, StoreError, TagflowError};
use crate::observability::PhaseTimer;
use crate::phases::PhaseExecutor;
use crate::source::{MediaItem, MediaSource};
use crate::store::StateStore;

/// Phase name used in error records for input fetch failures.
pub const FETCH_PHASE: &str = "fetch";

/// Result of a pipeline run for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The terminal phase completed during this run.
    Completed {
        /// The compiled extraction result.
        result: ExtractionResult,
        /// Where the result file was written.
        final_output_path: Option<PathBuf>,
        /// State writes that failed during the run.
        unsaved_writes: usize,
    },
    /// Every phase was already complete; nothing was executed or written.
    AlreadyComplete {
        /// The stored extraction result.
        result: ExtractionResult,
        /// Where the result file was written.
        final_output_path: Option<PathBuf>,
    },
    /// A phase, or the input fetch, failed during this run.
    Failed {
        /// The error that stopped the run.
        error: ErrorRecord,
        /// State writes that failed during the run.
        unsaved_writes: usize,
    },
    /// A phase failed in an earlier run and has not been reset.
    Blocked {
        /// The failed phase.
        phase: Phase,
        /// The most recent error recorded for it.
        last_error: Option<ErrorRecord>,
    },
}

impl PipelineOutcome {
    /// Returns true if the item is fully processed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::AlreadyComplete { .. })
    }

    /// The extraction result, if the item is fully processed.
    #[must_use]
    pub const fn result(&self) -> Option<&ExtractionResult> {
        match self {
            Self::Completed { result, .. } | Self::AlreadyComplete { result, .. } => Some(result),
            Self::Failed { .. } | Self::Blocked { .. } => None,
        }
    }

    /// The error that stopped processing, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Blocked { last_error, .. } => last_error.as_ref(),
            Self::Completed { .. } | Self::AlreadyComplete { .. } => None,
        }
    }
}

/// Drives items through the fixed phase order, persisting after every phase.
pub struct Pipeline {
    pub(super) store: Arc<dyn StateStore>,
    pub(super) executors: BTreeMap<Phase, Arc<dyn PhaseExecutor>>,
    pub(super) retry: RetryPolicy,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("phases", &self.executors.keys().collect::<Vec<_>>())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn run_span(collection_id: &str, item_id: &str) -> Span {
    info_span!(
        "pipeline_run",
        run_id = %Uuid::now_v7(),
        collection_id = %collection_id,
        item_id = %item_id,
    )
}

impl Pipeline {
    /// The state store backing this pipeline.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// The retry policy applied to input fetches.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Processes one item whose input is already available.
    ///
    /// Resumes from the stored record when there is one. Completed phases are
    /// never re-run; a record whose phases are all complete is returned as
    /// [`PipelineOutcome::AlreadyComplete`] without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error only when the pipeline itself is inconsistent, such as
    /// a phase with no registered executor.
    pub async fn run(
        &self,
        collection_id: &str,
        item_id: &str,
        item: &MediaItem,
    ) -> Result<PipelineOutcome> {
        async {
            let state = self.store.initialize_or_resume(collection_id, item_id).await;
            self.drive(state, item).await
        }
        .instrument(run_span(collection_id, item_id))
        .await
    }

    /// Processes one item, fetching its input from `source` only if some
    /// phase still needs to run.
    ///
    /// The fetch goes through the retry policy. When it is exhausted the error
    /// is appended to the record under the `fetch` phase name and no phase
    /// status changes.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::run`].
    pub async fn run_from_source(
        &self,
        source: &dyn MediaSource,
        collection_id: &str,
        item_id: &str,
    ) -> Result<PipelineOutcome> {
        async {
            let mut state = self.store.initialize_or_resume(collection_id, item_id).await;

            match next_phase(&state.completion_status) {
                NextPhase::Terminal => return Ok(Self::already_complete(&state)),
                NextPhase::Blocked(phase) => return Ok(Self::blocked(&state, phase)),
                NextPhase::Run(_) => {}
            }

            match retry(&self.retry, FETCH_PHASE, || source.fetch(item_id)).await {
                Ok(item) => self.drive(state, &item).await,
                Err(error) => {
                    error!(error = %error, "Failed to fetch item input");
                    state.push_error(error.clone());
                    let unsaved_writes = usize::from(!self.persist(&mut state).await);
                    Ok(PipelineOutcome::Failed { error, unsaved_writes })
                }
            }
        }
        .instrument(run_span(collection_id, item_id))
        .await
    }

    /// Explicitly returns a failed phase to `pending` so the next run retries it.
    ///
    /// # Errors
    ///
    /// Returns an error if no record exists, the phase is complete, or the
    /// updated record cannot be saved.
    pub async fn reset_phase(
        &self,
        collection_id: &str,
        item_id: &str,
        phase: Phase,
    ) -> Result<StateRecord> {
        let mut state = self.load_existing(collection_id, item_id).await?;
        let previous = state.completion_status.get(phase);
        state.completion_status.reset(phase)?;
        self.store.save(&mut state).await?;
        info!(
            collection_id = %collection_id,
            item_id = %item_id,
            phase = %phase,
            previous = %previous,
            "Phase reset"
        );
        Ok(state)
    }

    /// Resets every failed phase of a record. Returns the phases reset.
    ///
    /// # Errors
    ///
    /// Returns an error if no record exists or the updated record cannot be
    /// saved.
    pub async fn reset_failed(&self, collection_id: &str, item_id: &str) -> Result<Vec<Phase>> {
        let mut state = self.load_existing(collection_id, item_id).await?;
        let failed = state.completion_status.failed_phases();
        if failed.is_empty() {
            return Ok(failed);
        }
        for phase in &failed {
            state.completion_status.reset(*phase)?;
        }
        self.store.save(&mut state).await?;
        info!(
            collection_id = %collection_id,
            item_id = %item_id,
            phases = ?failed,
            "Failed phases reset"
        );
        Ok(failed)
    }

    async fn load_existing(&self, collection_id: &str, item_id: &str) -> Result<StateRecord> {
        self.store
            .load(collection_id, item_id)
            .await
            .ok_or_else(|| {
                StoreError::NotFound {
                    collection_id: collection_id.to_string(),
                    item_id: item_id.to_string(),
                }
                .into()
            })
    }

    async fn drive(&self, mut state: StateRecord, item: &MediaItem) -> Result<PipelineOutcome> {
        let mut unsaved_writes = 0;
        let mut executed = false;

        loop {
            let phase = match next_phase(&state.completion_status) {
                NextPhase::Run(phase) => phase,
                NextPhase::Blocked(phase) => return Ok(Self::blocked(&state, phase)),
                NextPhase::Terminal if executed => {
                    info!(
                        path = ?state.final_output_path,
                        unsaved_writes,
                        "Pipeline completed"
                    );
                    return Ok(PipelineOutcome::Completed {
                        result: state.compile(),
                        final_output_path: state.final_output_path.clone(),
                        unsaved_writes,
                    });
                }
                NextPhase::Terminal => return Ok(Self::already_complete(&state)),
            };

            let executor = self
                .executors
                .get(&phase)
                .ok_or(TagflowError::MissingExecutor(phase))?;

            info!(phase = %phase, "Phase started");
            let timer = PhaseTimer::start(phase);
            let output = executor.execute(&state, item).await;
            let duration_ms = timer.elapsed_ms();
            executed = true;

            let failure = Self::apply(&mut state, phase, output)?;
            if !self.persist(&mut state).await {
                unsaved_writes += 1;
            }

            if let Some(error) = failure {
                error!(phase = %phase, duration_ms, error = %error, "Phase failed");
                return Ok(PipelineOutcome::Failed { error, unsaved_writes });
            }
            info!(phase = %phase, duration_ms, "Phase complete");
        }
    }

    /// Merges a phase output into the record. Returns the failure, if any.
    fn apply(
        state: &mut StateRecord,
        phase: Phase,
        output: PhaseOutput,
    ) -> Result<Option<ErrorRecord>> {
        for update in output.updates {
            let owner = update.owner();
            if owner == phase {
                state.interim_results.apply(update);
            } else {
                warn!(phase = %phase, owner = %owner, "Dropped result update owned by another phase");
            }
        }

        let mut last_error = None;
        for error in output.errors {
            last_error = Some(error.clone());
            state.push_error(error);
        }

        if let Some(path) = output.final_output_path {
            if phase == Phase::TERMINAL {
                state.final_output_path = Some(path);
            } else {
                warn!(phase = %phase, path = %path.display(), "Ignored output path from non-terminal phase");
            }
        }

        if output.status == PhaseStatus::Complete {
            state.completion_status.mark(phase, PhaseStatus::Complete)?;
            return Ok(None);
        }

        let error = match (output.status, last_error) {
            (PhaseStatus::Failed, Some(error)) => error,
            (status, _) => {
                let error = ErrorRecord::new(
                    phase.as_str(),
                    format!("phase finished with status {status} and no error"),
                    0,
                );
                state.push_error(error.clone());
                error
            }
        };
        state.completion_status.mark(phase, PhaseStatus::Failed)?;
        Ok(Some(error))
    }

    /// Saves the record. Failures are logged and reported as `false`.
    async fn persist(&self, state: &mut StateRecord) -> bool {
        match self.store.save(state).await {
            Ok(()) => {
                debug!("State saved");
                true
            }
            Err(e) => {
                warn!(error = %e, "State not persisted; continuing with in-memory record");
                false
            }
        }
    }

    fn already_complete(state: &StateRecord) -> PipelineOutcome {
        debug!("All phases already complete");
        PipelineOutcome::AlreadyComplete {
            result: state.compile(),
            final_output_path: state.final_output_path.clone(),
        }
    }

    fn blocked(state: &StateRecord, phase: Phase) -> PipelineOutcome {
        let last_error = state
            .errors()
            .iter()
            .rev()
            .find(|e| e.phase == phase.as_str())
            .cloned();
        warn!(phase = %phase, "Phase previously failed; reset it to retry");
        PipelineOutcome::Blocked { phase, last_error }
    }
}
