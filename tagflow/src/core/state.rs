//! The persisted per-item state record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::output::ResultUpdate;
use super::results::{ExtractionResult, NormalizedMetadata, Process, SoftwareMention};
use super::{CompletionStatus, ErrorRecord};

/// Version of the on-disk state schema written by this crate.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Accumulated results, one field group per owning phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterimResults {
    /// Owned by `initialize`.
    pub metadata: Option<NormalizedMetadata>,
    /// Owned by `process_extraction`.
    pub processes: Vec<Process>,
    /// Owned by `process_summarization`.
    pub summary: Option<String>,
    /// Owned by `info_extraction`.
    pub software: Vec<SoftwareMention>,
    /// Owned by `info_extraction`.
    pub tags: Vec<String>,
    /// Owned by `info_extraction`; set when its fallback was used.
    pub extraction_error: Option<String>,
    /// Messages of every appended error record, in order.
    pub errors: Vec<String>,
}

impl InterimResults {
    /// Applies a phase's result update to the fields it owns.
    pub fn apply(&mut self, update: ResultUpdate) {
        match update {
            ResultUpdate::Metadata(metadata) => self.metadata = Some(metadata),
            ResultUpdate::Processes(processes) => self.processes = processes,
            ResultUpdate::Summary(summary) => self.summary = Some(summary),
            ResultUpdate::Info(info) => {
                self.software = info.software;
                self.tags = info.tags;
                self.extraction_error = info.error;
            }
        }
    }
}

/// Persisted unit of progress and results for one `(collection_id, item_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Schema version of this record.
    pub schema_version: u32,
    collection_id: String,
    item_id: String,
    /// Per-phase completion status.
    pub completion_status: CompletionStatus,
    /// Accumulated phase results.
    pub interim_results: InterimResults,
    /// Append-only error log.
    errors: Vec<ErrorRecord>,
    /// Last write time.
    pub timestamp: DateTime<Utc>,
    /// Location of the compiled result, set by the terminal phase.
    pub final_output_path: Option<PathBuf>,
}

impl StateRecord {
    /// Creates a fresh record with every phase pending.
    #[must_use]
    pub fn new(collection_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            collection_id: collection_id.into(),
            item_id: item_id.into(),
            completion_status: CompletionStatus::new(),
            interim_results: InterimResults::default(),
            errors: Vec::new(),
            timestamp: Utc::now(),
            final_output_path: None,
        }
    }

    /// The collection this item belongs to.
    #[must_use]
    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// The item identifier.
    #[must_use]
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// The error log, oldest first.
    #[must_use]
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Appends an error record.
    pub fn push_error(&mut self, error: ErrorRecord) {
        self.interim_results.errors.push(error.message.clone());
        self.errors.push(error);
    }

    /// Refreshes the last-write time.
    pub fn touch(&mut self) {
        self.timestamp = Utc::now();
    }

    /// Returns true when the terminal phase is complete.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.completion_status.is_terminal()
    }

    /// Builds the extraction result from the accumulated interim results.
    #[must_use]
    pub fn compile(&self) -> ExtractionResult {
        let results = &self.interim_results;
        ExtractionResult {
            metadata: results.metadata.clone(),
            software: results.software.clone(),
            tags: results.tags.clone(),
            processes: results.processes.clone(),
            summary: results.summary.clone(),
            error: results.extraction_error.clone(),
        }
    }
}
