//! Test doubles for the pipeline's collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::core::{Phase, PhaseOutput, StateRecord};
use crate::errors::{InferenceError, SourceError, StoreError};
use crate::inference::{Completion, CompletionRequest, InferenceClient};
use crate::phases::PhaseExecutor;
use crate::source::{MediaItem, MediaSource};
use crate::store::{InMemoryStateStore, StateStore};

/// Inference client that replays queued responses in order and records
/// every request it receives.
///
/// When the queue is empty the default response is returned, if one is set;
/// otherwise the call fails with a network error.
#[derive(Debug, Default)]
pub struct ScriptedInferenceClient {
    responses: Mutex<VecDeque<Result<Completion, InferenceError>>>,
    fallback: Mutex<Option<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedInferenceClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client that answers every request with `content`.
    #[must_use]
    pub fn always(content: impl Into<String>) -> Self {
        let client = Self::new();
        *client.fallback.lock() = Some(content.into());
        client
    }

    /// Queues a successful response.
    #[must_use]
    pub fn respond(self, content: impl Into<String>) -> Self {
        self.responses.lock().push_back(Ok(Completion::text(content)));
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn fail(self, error: InferenceError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Number of requests received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInferenceClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, InferenceError> {
        self.requests.lock().push(request.clone());
        if let Some(next) = self.responses.lock().pop_front() {
            return next;
        }
        match self.fallback.lock().as_ref() {
            Some(content) => Ok(Completion::text(content.clone())),
            None => Err(InferenceError::Network {
                message: "no scripted response left".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Media source serving fixed items and counting fetches.
#[derive(Debug, Default)]
pub struct StaticSource {
    items: HashMap<String, MediaItem>,
    fetches: Mutex<usize>,
}

impl StaticSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item.
    #[must_use]
    pub fn with_item(mut self, item_id: impl Into<String>, item: MediaItem) -> Self {
        self.items.insert(item_id.into(), item);
        self
    }

    /// Number of fetches made.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock()
    }
}

#[async_trait]
impl MediaSource for StaticSource {
    async fn fetch(&self, item_id: &str) -> Result<MediaItem, SourceError> {
        *self.fetches.lock() += 1;
        self.items
            .get(item_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                item_id: item_id.to_string(),
            })
    }
}

/// State store whose saves fail while a switch is on. Loads and successful
/// saves go to an inner in-memory store.
#[derive(Debug, Default, Clone)]
pub struct FailingStateStore {
    inner: InMemoryStateStore,
    failing: Arc<Mutex<bool>>,
    failed_saves: Arc<Mutex<usize>>,
}

impl FailingStateStore {
    /// Creates a store whose saves fail until
    /// [`set_failing(false)`](Self::set_failing) is called.
    #[must_use]
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    /// Turns save failures on or off.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Number of rejected saves.
    #[must_use]
    pub fn failed_saves(&self) -> usize {
        *self.failed_saves.lock()
    }

    /// The backing in-memory store.
    #[must_use]
    pub const fn inner(&self) -> &InMemoryStateStore {
        &self.inner
    }
}

#[async_trait]
impl StateStore for FailingStateStore {
    async fn load(&self, collection_id: &str, item_id: &str) -> Option<StateRecord> {
        self.inner.load(collection_id, item_id).await
    }

    async fn save(&self, state: &mut StateRecord) -> Result<(), StoreError> {
        if *self.failing.lock() {
            *self.failed_saves.lock() += 1;
            return Err(StoreError::Write {
                path: format!("{}_{}", state.collection_id(), state.item_id()).into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.save(state).await
    }
}

/// Phase executor returning a configurable output and recording each call.
#[derive(Debug)]
pub struct ScriptedPhase {
    phase: Phase,
    output: Mutex<PhaseOutput>,
    calls: Mutex<usize>,
}

impl ScriptedPhase {
    /// Creates an executor for `phase` that completes with no updates.
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self::returning(phase, PhaseOutput::complete())
    }

    /// Creates an executor for `phase` returning `output`.
    #[must_use]
    pub fn returning(phase: Phase, output: PhaseOutput) -> Self {
        Self {
            phase,
            output: Mutex::new(output),
            calls: Mutex::new(0),
        }
    }

    /// Sets the output to return from now on.
    pub fn set_output(&self, output: PhaseOutput) {
        *self.output.lock() = output;
    }

    /// Number of executions.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl PhaseExecutor for ScriptedPhase {
    fn phase(&self) -> Phase {
        self.phase
    }

    async fn execute(&self, _state: &StateRecord, _item: &MediaItem) -> PhaseOutput {
        *self.calls.lock() += 1;
        self.output.lock().clone()
    }
}
