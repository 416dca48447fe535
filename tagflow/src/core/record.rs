//! Error records attributed to a phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured failure description: which phase, what happened, and on
/// which attempt it was given up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Name of the phase (or operation) that failed.
    pub phase: String,
    /// Error text.
    pub message: String,
    /// Zero-based index of the last attempt made.
    pub retry_count: u32,
}

impl ErrorRecord {
    /// Creates a new error record.
    #[must_use]
    pub fn new(phase: impl Into<String>, message: impl Into<String>, retry_count: u32) -> Self {
        Self {
            phase: phase.into(),
            message: message.into(),
            retry_count,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (attempt {}): {}", self.phase, self.retry_count + 1, self.message)
    }
}

impl std::error::Error for ErrorRecord {}
