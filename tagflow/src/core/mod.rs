//! Core domain model types for tagflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Phase identifiers and completion status
//! - The persisted state record and its interim results
//! - Error records and phase outputs

mod output;
mod record;
mod results;
mod state;
mod status;

pub use output::{PhaseOutput, ResultUpdate};
pub use record::ErrorRecord;
pub use results::{
    ExtractionResult, InfoExtraction, NormalizedMetadata, Process, SoftwareMention,
};
pub use state::{InterimResults, StateRecord, STATE_SCHEMA_VERSION};
pub use status::{CompletionStatus, Phase, PhaseStatus};
