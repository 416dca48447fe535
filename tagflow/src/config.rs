//! Configuration types for the pipeline and its collaborators.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::TagflowError;
use crate::pipeline::RetryPolicy;

/// Inference backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Backend base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature for extraction prompts.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Context window size.
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    /// Maximum tokens to generate.
    #[serde(default = "default_num_predict")]
    pub num_predict: i32,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

const fn default_temperature() -> f32 {
    0.1
}

const fn default_timeout() -> u64 {
    120
}

const fn default_num_ctx() -> u32 {
    4096
}

const fn default_num_predict() -> i32 {
    1024
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            num_ctx: default_num_ctx(),
            num_predict: default_num_predict(),
        }
    }
}

impl InferenceConfig {
    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Bounds applied when embedding item content in prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptLimits {
    /// Cap on the concatenated transcript.
    pub transcript_max_chars: usize,
    /// Portion of the capped transcript embedded in a prompt.
    pub prompt_transcript_chars: usize,
    /// Cap on the description excerpt.
    pub description_max_chars: usize,
    /// Appended when text is cut.
    pub truncation_marker: String,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            transcript_max_chars: 16_000,
            prompt_transcript_chars: 4_000,
            description_max_chars: 300,
            truncation_marker: "...".to_string(),
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagflowConfig {
    /// Directory holding state files.
    pub state_dir: PathBuf,
    /// Directory receiving extraction result files.
    pub output_dir: PathBuf,
    /// Retry policy for remote calls.
    pub retry: RetryPolicy,
    /// Inference backend settings.
    pub inference: InferenceConfig,
    /// Prompt bounds.
    pub prompt: PromptLimits,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for TagflowConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("state"),
            output_dir: PathBuf::from("output"),
            retry: RetryPolicy::default(),
            inference: InferenceConfig::default(),
            prompt: PromptLimits::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TagflowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TagflowError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| TagflowError::Config(format!("{}: {e}", path.display())))
    }

    /// Sets the state directory.
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the inference settings.
    #[must_use]
    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    /// Sets the prompt limits.
    #[must_use]
    pub fn with_prompt_limits(mut self, prompt: PromptLimits) -> Self {
        self.prompt = prompt;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = TagflowConfig::default();
        assert_eq!(config.state_dir, PathBuf::from("state"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.prompt.transcript_max_chars, 16_000);
        assert_eq!(config.inference.endpoint, "http://localhost:11434");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"output_dir": "out", "retry": {"max_retries": 5}, "inference": {"model": "qwen"}}"#;
        let config: TagflowConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.state_dir, PathBuf::from("state"));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.inference.model, "qwen");
        assert_eq!(config.inference.num_ctx, 4096);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagflow.json");
        std::fs::write(&path, r#"{"state_dir": "/var/tagflow"}"#).unwrap();

        let config = TagflowConfig::from_json_file(&path).unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/var/tagflow"));

        std::fs::write(&path, "nope").unwrap();
        assert!(matches!(
            TagflowConfig::from_json_file(&path),
            Err(TagflowError::Config(_))
        ));
    }
}
