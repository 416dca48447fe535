//! Phase selection.

use crate::core::{CompletionStatus, Phase, PhaseStatus};

/// What the engine should do next for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPhase {
    /// Run this phase.
    Run(Phase),
    /// This phase failed earlier and must be reset before the item can move on.
    Blocked(Phase),
    /// Every phase is complete.
    Terminal,
}

/// Returns the first phase in order whose status is not `complete`.
#[must_use]
pub fn next_phase(status: &CompletionStatus) -> NextPhase {
    Phase::ALL
        .iter()
        .find_map(|&phase| match status.get(phase) {
            PhaseStatus::Complete => None,
            PhaseStatus::Pending => Some(NextPhase::Run(phase)),
            PhaseStatus::Failed => Some(NextPhase::Blocked(phase)),
        })
        .unwrap_or(NextPhase::Terminal)
}
