//! Test assertions for pipeline outcomes and state records.

use crate::core::{ExtractionResult, Phase, PhaseStatus, StateRecord};
use crate::pipeline::PipelineOutcome;

/// Asserts that the run completed the terminal phase and returns its result.
pub fn assert_completed(outcome: &PipelineOutcome) -> &ExtractionResult {
    match outcome {
        PipelineOutcome::Completed { result, .. } => result,
        other => panic!("Expected a completed run, got: {other:?}"),
    }
}

/// Asserts that the run failed in `phase`.
pub fn assert_failed_in(outcome: &PipelineOutcome, phase: &str) {
    match outcome {
        PipelineOutcome::Failed { error, .. } => assert_eq!(
            error.phase, phase,
            "Expected failure in '{phase}', got failure in '{}'",
            error.phase
        ),
        other => panic!("Expected failure in '{phase}', got: {other:?}"),
    }
}

/// Asserts a phase's status in a record.
pub fn assert_phase_status(state: &StateRecord, phase: Phase, expected: PhaseStatus) {
    let actual = state.completion_status.get(phase);
    assert_eq!(
        actual, expected,
        "Expected {phase} to be {expected}, got {actual}"
    );
}

/// Asserts that the phases in `complete` are complete and every other phase
/// is pending.
pub fn assert_completed_through(state: &StateRecord, complete: &[Phase]) {
    for (phase, status) in state.completion_status.iter() {
        let expected = if complete.contains(&phase) {
            PhaseStatus::Complete
        } else {
            PhaseStatus::Pending
        };
        assert_eq!(status, expected, "Unexpected status for {phase}");
    }
}
