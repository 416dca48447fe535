//! Phase output type with factory methods.

use std::path::PathBuf;

use super::results::{InfoExtraction, NormalizedMetadata, Process};
use super::{ErrorRecord, Phase, PhaseStatus};

/// A phase's contribution to the interim results.
///
/// Each variant belongs to exactly one phase; the engine refuses to apply
/// an update produced by any other phase.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultUpdate {
    /// Normalized metadata.
    Metadata(NormalizedMetadata),
    /// Extracted processes.
    Processes(Vec<Process>),
    /// Process summary.
    Summary(String),
    /// Software mentions and merged tags.
    Info(InfoExtraction),
}

impl ResultUpdate {
    /// The phase allowed to write this update.
    #[must_use]
    pub const fn owner(&self) -> Phase {
        match self {
            Self::Metadata(_) => Phase::Initialize,
            Self::Processes(_) => Phase::ExtractProcesses,
            Self::Summary(_) => Phase::Summarize,
            Self::Info(_) => Phase::ExtractInfo,
        }
    }
}

/// The output of a phase execution.
///
/// Phases never return errors; failure is expressed through
/// [`PhaseStatus::Failed`] plus the attached error records.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutput {
    /// `Complete` or `Failed`.
    pub status: PhaseStatus,
    /// Results to merge into the record.
    pub updates: Vec<ResultUpdate>,
    /// Error records to append to the record.
    pub errors: Vec<ErrorRecord>,
    /// Set by the terminal phase.
    pub final_output_path: Option<PathBuf>,
}

impl PhaseOutput {
    /// A successful output with no updates.
    #[must_use]
    pub const fn complete() -> Self {
        Self {
            status: PhaseStatus::Complete,
            updates: Vec::new(),
            errors: Vec::new(),
            final_output_path: None,
        }
    }

    /// A successful output carrying one update.
    #[must_use]
    pub fn complete_with(update: ResultUpdate) -> Self {
        Self::complete().with_update(update)
    }

    /// A failed output carrying the error that caused it.
    #[must_use]
    pub fn failed(error: ErrorRecord) -> Self {
        Self {
            status: PhaseStatus::Failed,
            updates: Vec::new(),
            errors: vec![error],
            final_output_path: None,
        }
    }

    /// Adds an update.
    #[must_use]
    pub fn with_update(mut self, update: ResultUpdate) -> Self {
        self.updates.push(update);
        self
    }

    /// Attaches a non-fatal error record.
    #[must_use]
    pub fn with_error(mut self, error: ErrorRecord) -> Self {
        self.errors.push(error);
        self
    }

    /// Sets the final output path.
    #[must_use]
    pub fn with_final_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.final_output_path = Some(path.into());
        self
    }

    /// Returns true if the phase completed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}
