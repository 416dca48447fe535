//! # Tagflow
//!
//! A resumable phase pipeline that extracts software mentions and tags from
//! media transcripts using a remote inference backend.
//!
//! Tagflow processes each item through a fixed sequence of phases with:
//!
//! - **Persisted progress**: a state record per item is saved after every phase
//! - **Idempotent resume**: completed phases are never re-run
//! - **Retry with backoff**: remote calls are retried and failures become error records
//! - **Graceful degradation**: malformed model output falls back to heuristics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tagflow::prelude::*;
//!
//! let config = TagflowConfig::default();
//! let client = Arc::new(OllamaClient::new(&config.inference)?);
//! let pipeline = PipelineBuilder::from_config(&config, client).build()?;
//!
//! let source = JsonDumpSource::new("transcripts");
//! let outcome = pipeline.run_from_source(&source, "UC123", "dQw4w9WgXcQ").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod inference;
pub mod observability;
pub mod phases;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::config::{InferenceConfig, LoggingConfig, PromptLimits, TagflowConfig};
    pub use crate::core::{
        CompletionStatus, ErrorRecord, ExtractionResult, Phase, PhaseOutput, PhaseStatus,
        StateRecord,
    };
    pub use crate::errors::{Result, TagflowError};
    #[cfg(feature = "ollama")]
    pub use crate::inference::OllamaClient;
    pub use crate::inference::{Completion, CompletionRequest, InferenceClient};
    pub use crate::observability::init_tracing;
    pub use crate::phases::PhaseExecutor;
    pub use crate::pipeline::{
        next_phase, NextPhase, Pipeline, PipelineBuilder, PipelineOutcome, RetryPolicy,
    };
    pub use crate::source::{JsonDumpSource, MediaItem, MediaSource};
    pub use crate::store::{InMemoryStateStore, JsonFileStateStore, StateStore};
}
