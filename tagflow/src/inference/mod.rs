//! The text-generation capability consumed by the extraction phases.
//!
//! Phases depend only on [`InferenceClient`]; the concrete backend is
//! constructed by the caller and passed in, so its lifetime is scoped to the
//! pipeline that owns it.

#[cfg(feature = "ollama")]
mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::InferenceError;

#[cfg(feature = "ollama")]
pub use ollama::OllamaClient;

/// Requested shape of the completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free text.
    Text,
    /// A JSON document, possibly wrapped in a fenced code block.
    #[default]
    Json,
}

/// A single-prompt completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// User prompt.
    pub prompt: String,
    /// Optional system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Requested output format.
    pub format: ResponseFormat,
    /// Sampling temperature.
    pub temperature: f32,
}

impl CompletionRequest {
    /// Creates a JSON-format request.
    #[must_use]
    pub fn json(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            format: ResponseFormat::Json,
            temperature,
        }
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A completion returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Raw content: JSON text, JSON in a fenced block, or free text.
    pub content: String,
    /// Prompt tokens, if the backend reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    /// Generated tokens, if the backend reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
}

impl Completion {
    /// A completion with content only.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    /// Returns total tokens.
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens
            .unwrap_or(0)
            .saturating_add(self.completion_tokens.unwrap_or(0))
    }
}

/// A remote text-generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Generates a completion for the request.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, InferenceError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
