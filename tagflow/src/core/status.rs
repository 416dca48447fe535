//! Phase identifiers and per-phase completion status.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::StatusTransitionError;

/// One named stage of the pipeline.
///
/// Variants are declared in execution order; [`Phase::ALL`] is the
/// authoritative ordering used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Normalizes item metadata.
    #[serde(rename = "initialize")]
    Initialize,
    /// Extracts the processes demonstrated in the item.
    #[serde(rename = "process_extraction")]
    ExtractProcesses,
    /// Summarizes the extracted processes.
    #[serde(rename = "process_summarization")]
    Summarize,
    /// Extracts software mentions and tags.
    #[serde(rename = "info_extraction")]
    ExtractInfo,
    /// Writes the extraction result file. Terminal phase.
    #[serde(rename = "output_compilation")]
    CompileOutput,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Self; 5] = [
        Self::Initialize,
        Self::ExtractProcesses,
        Self::Summarize,
        Self::ExtractInfo,
        Self::CompileOutput,
    ];

    /// The phase whose completion marks the item as done.
    pub const TERMINAL: Self = Self::CompileOutput;

    /// Returns the serialized name of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::ExtractProcesses => "process_extraction",
            Self::Summarize => "process_summarization",
            Self::ExtractInfo => "info_extraction",
            Self::CompileOutput => "output_compilation",
        }
    }

    /// Interim result keys this phase is allowed to write.
    #[must_use]
    pub const fn owned_keys(self) -> &'static [&'static str] {
        match self {
            Self::Initialize => &["metadata"],
            Self::ExtractProcesses => &["processes"],
            Self::Summarize => &["summary"],
            Self::ExtractInfo => &["software", "tags", "extraction_error"],
            Self::CompileOutput => &[],
        }
    }

    /// Returns true if `key` belongs to this phase.
    #[must_use]
    pub fn owns(self, key: &str) -> bool {
        self.owned_keys().contains(&key)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The completion status of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Not yet run, or explicitly reset.
    #[default]
    Pending,
    /// Finished successfully.
    Complete,
    /// Retries exhausted with no usable fallback.
    Failed,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl PhaseStatus {
    /// Returns true if the phase finished successfully.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns true if the phase failed.
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Mapping from phase to its completion status.
///
/// Every phase is always present. A `complete` phase never moves to another
/// status; a `failed` phase only returns to `pending` through [`reset`].
///
/// [`reset`]: CompletionStatus::reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Phase, PhaseStatus>", into = "BTreeMap<Phase, PhaseStatus>")]
pub struct CompletionStatus {
    statuses: BTreeMap<Phase, PhaseStatus>,
}

impl Default for CompletionStatus {
    fn default() -> Self {
        Self {
            statuses: Phase::ALL.iter().map(|p| (*p, PhaseStatus::Pending)).collect(),
        }
    }
}

impl From<BTreeMap<Phase, PhaseStatus>> for CompletionStatus {
    fn from(mut statuses: BTreeMap<Phase, PhaseStatus>) -> Self {
        for phase in Phase::ALL {
            statuses.entry(phase).or_default();
        }
        Self { statuses }
    }
}

impl From<CompletionStatus> for BTreeMap<Phase, PhaseStatus> {
    fn from(status: CompletionStatus) -> Self {
        status.statuses
    }
}

impl CompletionStatus {
    /// Creates a status map with every phase pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the status of a phase.
    #[must_use]
    pub fn get(&self, phase: Phase) -> PhaseStatus {
        self.statuses.get(&phase).copied().unwrap_or_default()
    }

    /// Moves a phase to `complete` or `failed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the phase is already complete, or if `status` is
    /// `pending` (use [`CompletionStatus::reset`] for that).
    pub fn mark(&mut self, phase: Phase, status: PhaseStatus) -> Result<(), StatusTransitionError> {
        let current = self.get(phase);
        if current.is_complete() && !status.is_complete() {
            return Err(StatusTransitionError::Regression { phase, from: current, to: status });
        }
        if status == PhaseStatus::Pending {
            return Err(StatusTransitionError::ImplicitReset { phase, from: current });
        }
        self.statuses.insert(phase, status);
        Ok(())
    }

    /// Explicitly resets a failed phase to pending.
    ///
    /// Resetting a pending phase is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the phase is complete.
    pub fn reset(&mut self, phase: Phase) -> Result<(), StatusTransitionError> {
        match self.get(phase) {
            PhaseStatus::Complete => Err(StatusTransitionError::Regression {
                phase,
                from: PhaseStatus::Complete,
                to: PhaseStatus::Pending,
            }),
            PhaseStatus::Failed | PhaseStatus::Pending => {
                self.statuses.insert(phase, PhaseStatus::Pending);
                Ok(())
            }
        }
    }

    /// Iterates phases with their status in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, PhaseStatus)> + '_ {
        Phase::ALL.iter().map(move |p| (*p, self.get(*p)))
    }

    /// Phases currently marked failed.
    #[must_use]
    pub fn failed_phases(&self) -> Vec<Phase> {
        self.iter().filter(|(_, s)| s.is_failed()).map(|(p, _)| p).collect()
    }

    /// Returns true when the terminal phase is complete.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.get(Phase::TERMINAL).is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut sorted = Phase::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Phase::ALL.to_vec());
        assert_eq!(Phase::ALL.last(), Some(&Phase::TERMINAL));
    }

    #[test]
    fn test_phase_serialize() {
        let json = serde_json::to_string(&Phase::ExtractInfo).unwrap();
        assert_eq!(json, r#""info_extraction""#);
        assert_eq!(Phase::ExtractInfo.to_string(), "info_extraction");
    }

    #[test]
    fn test_owned_keys_disjoint() {
        for a in Phase::ALL {
            for b in Phase::ALL {
                if a == b {
                    continue;
                }
                for key in a.owned_keys() {
                    assert!(!b.owns(key), "{key} owned by both {a} and {b}");
                }
            }
        }
    }

    #[test]
    fn test_new_status_all_pending() {
        let status = CompletionStatus::new();
        assert!(status.iter().all(|(_, s)| s == PhaseStatus::Pending));
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_complete_never_regresses() {
        let mut status = CompletionStatus::new();
        status.mark(Phase::Initialize, PhaseStatus::Complete).unwrap();

        assert!(status.mark(Phase::Initialize, PhaseStatus::Failed).is_err());
        assert!(status.reset(Phase::Initialize).is_err());
        assert_eq!(status.get(Phase::Initialize), PhaseStatus::Complete);
    }

    #[test]
    fn test_failed_only_resets_explicitly() {
        let mut status = CompletionStatus::new();
        status.mark(Phase::Summarize, PhaseStatus::Failed).unwrap();

        assert!(status.mark(Phase::Summarize, PhaseStatus::Pending).is_err());
        status.reset(Phase::Summarize).unwrap();
        assert_eq!(status.get(Phase::Summarize), PhaseStatus::Pending);
    }

    #[test]
    fn test_status_serialize_fills_missing_phases() {
        let json = r#"{"initialize":"complete"}"#;
        let status: CompletionStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.get(Phase::Initialize), PhaseStatus::Complete);
        assert_eq!(status.get(Phase::CompileOutput), PhaseStatus::Pending);

        let round = serde_json::to_value(&status).unwrap();
        assert_eq!(round["output_compilation"], "pending");
    }
}
