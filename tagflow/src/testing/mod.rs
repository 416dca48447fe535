//! Testing utilities for tagflow pipelines.
//!
//! This module provides:
//! - Scripted inference, source, store, and phase doubles
//! - Assertions for pipeline outcomes and state records

mod assertions;
mod mocks;

pub use assertions::{
    assert_completed, assert_completed_through, assert_failed_in, assert_phase_status,
};
pub use mocks::{
    FailingStateStore, ScriptedInferenceClient, ScriptedPhase, StaticSource,
};
