//! Error types for the tagflow crate.
//!
//! Per-item failures inside the pipeline are carried as data
//! ([`ErrorRecord`](crate::core::ErrorRecord)); the types here describe
//! failures of the collaborators themselves and caller-side misuse.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::{Phase, PhaseStatus};

/// The main error type for tagflow operations.
#[derive(Debug, Error)]
pub enum TagflowError {
    /// A state store operation failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// An inference call failed.
    #[error("{0}")]
    Inference(#[from] InferenceError),

    /// A media source call failed.
    #[error("{0}")]
    Source(#[from] SourceError),

    /// A completion status transition was rejected.
    #[error("{0}")]
    Status(#[from] StatusTransitionError),

    /// No executor was registered for a phase.
    #[error("No executor registered for phase '{0}'")]
    MissingExecutor(Phase),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by state stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the record failed.
    #[error("Failed to write state file {path}: {source}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The record could not be serialized.
    #[error("Failed to serialize state for {collection_id}/{item_id}: {source}")]
    Serialize {
        /// Collection identifier.
        collection_id: String,
        /// Item identifier.
        item_id: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// No record exists for the key.
    #[error("No state recorded for {collection_id}/{item_id}")]
    NotFound {
        /// Collection identifier.
        collection_id: String,
        /// Item identifier.
        item_id: String,
    },
}

/// Errors raised by inference clients.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// The request timed out.
    #[error("Inference request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },

    /// The backend could not be reached.
    #[error("Inference network error: {message}")]
    Network {
        /// Error detail.
        message: String,
    },

    /// The backend answered with an error status.
    #[error("Inference backend returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The backend's envelope could not be decoded.
    #[error("Invalid inference response: {message}")]
    InvalidResponse {
        /// Error detail.
        message: String,
    },
}

/// Errors raised by media sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The item does not exist in the source.
    #[error("Item not found: {item_id}")]
    NotFound {
        /// Requested item.
        item_id: String,
    },

    /// The item exists but could not be read.
    #[error("Failed to read item {item_id}: {source}")]
    Io {
        /// Requested item.
        item_id: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The id cannot name an item in this source.
    #[error("Invalid item id: {item_id:?}")]
    InvalidId {
        /// Requested item.
        item_id: String,
    },

    /// The item could not be decoded.
    #[error("Malformed item {item_id}: {source}")]
    Malformed {
        /// Requested item.
        item_id: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// A rejected completion status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusTransitionError {
    /// A complete phase may not move to any other status.
    #[error("Phase '{phase}' cannot move from {from} to {to}")]
    Regression {
        /// The phase.
        phase: Phase,
        /// Current status.
        from: PhaseStatus,
        /// Requested status.
        to: PhaseStatus,
    },

    /// Only an explicit reset may move a phase back to pending.
    #[error("Phase '{phase}' is {from}; use an explicit reset to make it pending")]
    ImplicitReset {
        /// The phase.
        phase: Phase,
        /// Current status.
        from: PhaseStatus,
    },
}

/// Convenience result alias.
pub type Result<T, E = TagflowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = StatusTransitionError::Regression {
            phase: Phase::Initialize,
            from: PhaseStatus::Complete,
            to: PhaseStatus::Failed,
        };
        assert_eq!(
            err.to_string(),
            "Phase 'initialize' cannot move from complete to failed"
        );
    }

    #[test]
    fn test_tagflow_error_from_source() {
        let err: TagflowError = SourceError::NotFound { item_id: "abc".into() }.into();
        assert!(matches!(err, TagflowError::Source(_)));
        assert_eq!(err.to_string(), "Item not found: abc");
    }

    #[test]
    fn test_inference_error_display() {
        let err = InferenceError::Http { status: 500, body: "oops".into() };
        assert!(err.to_string().contains("HTTP 500"));
    }
}
