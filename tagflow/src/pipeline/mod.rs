//! Pipeline building and execution.
//!
//! This module provides:
//! - The retry policy wrapped around every remote call
//! - The pure phase transition rule
//! - The resumable engine and its builder

mod builder;
mod engine;
#[cfg(test)]
mod engine_tests;
mod retry;
mod transition;

pub use builder::PipelineBuilder;
pub use engine::{Pipeline, PipelineOutcome, FETCH_PHASE};
pub use retry::{retry, JitterStrategy, RetryPolicy};
pub use transition::{next_phase, NextPhase};
