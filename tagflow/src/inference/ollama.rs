//! Ollama HTTP client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{Completion, CompletionRequest, InferenceClient, ResponseFormat};
use crate::config::InferenceConfig;
use crate::errors::InferenceError;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_ctx: u32,
    num_predict: i32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
    #[serde(default)]
    done: bool,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

/// Client for a local or remote Ollama server's `/api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: String,
    model: String,
    num_ctx: u32,
    num_predict: i32,
    timeout: Duration,
    http_client: Client,
}

impl OllamaClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Network {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            num_ctx: config.num_ctx,
            num_predict: config.num_predict,
            timeout,
            http_client,
        })
    }

    /// The model used for completions.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns true if the server answers on `/api/tags`.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Ollama health check failed");
                false
            }
        }
    }

    fn map_send_error(&self, e: &reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            InferenceError::Network {
                message: format!("Cannot connect to Ollama at {}: {e}", self.endpoint),
            }
        } else {
            InferenceError::Network {
                message: format!("Request failed: {e}"),
            }
        }
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, InferenceError> {
        let url = format!("{}/api/chat", self.endpoint);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: &request.prompt });

        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: match request.format {
                ResponseFormat::Json => Some("json"),
                ResponseFormat::Text => None,
            },
            options: ChatOptions {
                temperature: request.temperature,
                num_ctx: self.num_ctx,
                num_predict: self.num_predict,
            },
        };

        debug!(model = %self.model, prompt_chars = request.prompt.len(), "Sending chat request");
        let start = Instant::now();

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| InferenceError::InvalidResponse {
            message: e.to_string(),
        })?;

        if !parsed.done {
            warn!(model = %self.model, "Ollama response indicates incomplete generation");
        }

        let elapsed = start.elapsed();
        let completion_tokens = parsed.eval_count.unwrap_or(0);
        let tokens_per_second = if elapsed.as_secs_f64() > 0.0 {
            f64::from(completion_tokens) / elapsed.as_secs_f64()
        } else {
            0.0
        };
        info!(
            model = %self.model,
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            prompt_chars = request.prompt.len(),
            prompt_tokens = parsed.prompt_eval_count.unwrap_or(0),
            completion_tokens,
            tokens_per_second,
            "Ollama completion finished"
        );

        Ok(Completion {
            content: parsed.message.content,
            prompt_tokens: parsed.prompt_eval_count,
            completion_tokens: parsed.eval_count,
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
