//! Pipeline builder with validation.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{Pipeline, RetryPolicy};
use crate::config::TagflowConfig;
use crate::core::Phase;
use crate::errors::TagflowError;
use crate::inference::InferenceClient;
use crate::phases::{default_executors, InferenceContext, PhaseExecutor};
use crate::store::{JsonFileStateStore, StateStore};

/// Builder for creating validated pipelines.
pub struct PipelineBuilder {
    /// Where records are loaded from and saved to.
    store: Arc<dyn StateStore>,
    /// One executor per phase.
    executors: BTreeMap<Phase, Arc<dyn PhaseExecutor>>,
    /// Policy for input fetches.
    retry: RetryPolicy,
}

impl PipelineBuilder {
    /// Creates a builder with no executors registered.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            executors: BTreeMap::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a builder with a file store and the standard executors, all
    /// configured from `config`.
    #[must_use]
    pub fn from_config(config: &TagflowConfig, client: Arc<dyn InferenceClient>) -> Self {
        Self::new(Arc::new(JsonFileStateStore::new(&config.state_dir)))
            .with_default_phases(client, config)
    }

    /// Registers an executor for the phase it reports, replacing any previous one.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn PhaseExecutor>) -> Self {
        let phase = executor.phase();
        if self.executors.insert(phase, executor).is_some() {
            debug!(phase = %phase, "Replaced phase executor");
        }
        self
    }

    /// Registers the standard executor for every phase.
    #[must_use]
    pub fn with_default_phases(
        mut self,
        client: Arc<dyn InferenceClient>,
        config: &TagflowConfig,
    ) -> Self {
        let ctx = InferenceContext::new(client)
            .with_retry(config.retry.clone())
            .with_limits(config.prompt.clone())
            .with_temperature(config.inference.temperature);

        for executor in default_executors(&ctx, &config.output_dir) {
            self = self.executor(executor);
        }
        self.with_retry(config.retry.clone())
    }

    /// Sets the retry policy used for input fetches.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`TagflowError::MissingExecutor`] if any phase has no executor.
    pub fn build(self) -> Result<Pipeline, TagflowError> {
        if let Some(phase) = Phase::ALL
            .iter()
            .find(|phase| !self.executors.contains_key(phase))
        {
            return Err(TagflowError::MissingExecutor(*phase));
        }

        Ok(Pipeline {
            store: self.store,
            executors: self.executors,
            retry: self.retry,
        })
    }
}
