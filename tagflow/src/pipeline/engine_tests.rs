use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use super::{Pipeline, PipelineBuilder, PipelineOutcome, RetryPolicy};
use crate::config::TagflowConfig;
use crate::core::{
    ErrorRecord, InfoExtraction, NormalizedMetadata, Phase, PhaseOutput, PhaseStatus,
    ResultUpdate, SoftwareMention, StateRecord,
};
use crate::errors::{InferenceError, StoreError, TagflowError};
use crate::source::MediaItem;
use crate::store::{InMemoryStateStore, JsonFileStateStore, StateStore};
use crate::testing::{
    assert_completed, assert_completed_through, assert_failed_in, assert_phase_status,
    FailingStateStore, ScriptedInferenceClient, ScriptedPhase, StaticSource,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_max_retries(1).with_base_delay_ms(1)
}

fn figma_item() -> MediaItem {
    serde_json::from_value(json!({
        "transcript": [{"text": "intro"}, {"text": "uses Figma and VSCode"}],
        "video_info": {"video": {"title": "X", "tags": ["design"]}, "channel": {"id": "UC1"}}
    }))
    .unwrap()
}

struct Scripted {
    pipeline: Pipeline,
    phases: Vec<Arc<ScriptedPhase>>,
}

impl Scripted {
    fn new(store: Arc<dyn StateStore>) -> Self {
        let phases: Vec<Arc<ScriptedPhase>> = vec![
            Arc::new(ScriptedPhase::returning(
                Phase::Initialize,
                PhaseOutput::complete_with(ResultUpdate::Metadata(NormalizedMetadata {
                    title: "X".into(),
                    ..Default::default()
                })),
            )),
            Arc::new(ScriptedPhase::returning(
                Phase::ExtractProcesses,
                PhaseOutput::complete_with(ResultUpdate::Processes(Vec::new())),
            )),
            Arc::new(ScriptedPhase::returning(
                Phase::Summarize,
                PhaseOutput::complete_with(ResultUpdate::Summary("s".into())),
            )),
            Arc::new(ScriptedPhase::returning(
                Phase::ExtractInfo,
                PhaseOutput::complete_with(ResultUpdate::Info(InfoExtraction {
                    software: vec![SoftwareMention::named("Figma")],
                    tags: vec!["design".into()],
                    error: None,
                })),
            )),
            Arc::new(ScriptedPhase::returning(
                Phase::CompileOutput,
                PhaseOutput::complete().with_final_output_path("out/X.json"),
            )),
        ];

        let mut builder = PipelineBuilder::new(store).with_retry(fast_retry());
        for phase in &phases {
            builder = builder.executor(phase.clone());
        }
        Self {
            pipeline: builder.build().unwrap(),
            phases,
        }
    }

    fn phase(&self, phase: Phase) -> &ScriptedPhase {
        &self.phases[Phase::ALL.iter().position(|p| *p == phase).unwrap()]
    }

    fn calls(&self) -> Vec<usize> {
        self.phases.iter().map(|p| p.call_count()).collect()
    }
}

#[tokio::test]
async fn test_end_to_end_with_default_phases() {
    let dir = TempDir::new().unwrap();
    let config = TagflowConfig::default()
        .with_state_dir(dir.path().join("state"))
        .with_output_dir(dir.path().join("out"))
        .with_retry(fast_retry());
    let client = Arc::new(
        ScriptedInferenceClient::new()
            .respond(r#"{"processes": [{"name": "Prototyping"}]}"#)
            .respond(r#"{"summary": "Shows prototyping in Figma."}"#)
            .respond(r#"{"software":[{"name":"Figma","mentions":1}],"tags":["prototyping"]}"#),
    );
    let pipeline = PipelineBuilder::from_config(&config, client.clone())
        .build()
        .unwrap();

    let outcome = pipeline.run("chan", "X", &figma_item()).await.unwrap();

    let result = assert_completed(&outcome);
    assert_eq!(result.tags, vec!["design", "prototyping"]);
    assert_eq!(result.software, vec![SoftwareMention::named("Figma").with_mentions(1)]);
    assert_eq!(result.summary.as_deref(), Some("Shows prototyping in Figma."));
    assert_eq!(client.call_count(), 3);

    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("out").join("X.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(written["software"], json!([{"name": "Figma", "mentions": 1}]));
    assert_eq!(written["tags"], json!(["design", "prototyping"]));
    assert_eq!(written["metadata"]["channel_id"], "UC1");

    let stored = JsonFileStateStore::new(dir.path().join("state"))
        .load("chan", "X")
        .await
        .unwrap();
    assert!(stored.is_terminal());
    assert_eq!(
        stored.final_output_path,
        Some(dir.path().join("out").join("X.json"))
    );
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let store = Arc::new(InMemoryStateStore::new());
    let scripted = Scripted::new(store.clone());

    let first = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();
    assert_completed(&first);
    let saves = store.save_count();
    let stored = store.load("c", "X").await.unwrap();

    let second = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();

    assert_eq!(scripted.calls(), vec![1; 5]);
    assert_eq!(store.save_count(), saves);
    assert_eq!(store.load("c", "X").await.unwrap(), stored);
    assert_eq!(
        second,
        PipelineOutcome::AlreadyComplete {
            result: stored.compile(),
            final_output_path: stored.final_output_path.clone(),
        }
    );
}

#[tokio::test]
async fn test_persists_after_every_phase() {
    let store = Arc::new(InMemoryStateStore::new());
    let scripted = Scripted::new(store.clone());

    scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();

    assert_eq!(store.save_count(), Phase::ALL.len());
}

#[tokio::test]
async fn test_failure_halts_and_blocks_until_reset() {
    let store = Arc::new(InMemoryStateStore::new());
    let scripted = Scripted::new(store.clone());
    let boom = ErrorRecord::new("process_summarization", "model offline", 1);
    scripted
        .phase(Phase::Summarize)
        .set_output(PhaseOutput::failed(boom.clone()));

    let outcome = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();
    assert_failed_in(&outcome, "process_summarization");
    assert_eq!(scripted.calls(), vec![1, 1, 1, 0, 0]);

    let state = store.load("c", "X").await.unwrap();
    assert_phase_status(&state, Phase::Summarize, PhaseStatus::Failed);
    assert_phase_status(&state, Phase::ExtractInfo, PhaseStatus::Pending);
    assert_eq!(state.errors(), &[boom.clone()]);
    assert_eq!(state.interim_results.metadata.as_ref().unwrap().title, "X");

    let blocked = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();
    assert_eq!(
        blocked,
        PipelineOutcome::Blocked {
            phase: Phase::Summarize,
            last_error: Some(boom),
        }
    );
    assert_eq!(scripted.calls(), vec![1, 1, 1, 0, 0]);

    scripted
        .phase(Phase::Summarize)
        .set_output(PhaseOutput::complete_with(ResultUpdate::Summary("ok".into())));
    let reset = scripted.pipeline.reset_failed("c", "X").await.unwrap();
    assert_eq!(reset, vec![Phase::Summarize]);

    let outcome = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();
    assert_eq!(assert_completed(&outcome).summary.as_deref(), Some("ok"));
    assert_eq!(scripted.calls(), vec![1, 1, 2, 1, 1]);
    assert_eq!(store.load("c", "X").await.unwrap().errors().len(), 1);
}

#[tokio::test]
async fn test_resumes_at_first_incomplete_phase() {
    let store = Arc::new(InMemoryStateStore::new());
    let mut state = StateRecord::new("c", "X");
    for phase in [Phase::Initialize, Phase::ExtractProcesses] {
        state.completion_status.mark(phase, PhaseStatus::Complete).unwrap();
    }
    store.insert(state);
    let scripted = Scripted::new(store.clone());

    let outcome = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(scripted.calls(), vec![0, 0, 1, 1, 1]);
}

#[tokio::test]
async fn test_status_never_regresses_during_run() {
    let store = Arc::new(InMemoryStateStore::new());
    let scripted = Scripted::new(store.clone());
    scripted
        .phase(Phase::ExtractInfo)
        .set_output(PhaseOutput::failed(ErrorRecord::new("info_extraction", "x", 0)));

    scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();

    let state = store.load("c", "X").await.unwrap();
    for phase in [Phase::Initialize, Phase::ExtractProcesses, Phase::Summarize] {
        assert_phase_status(&state, phase, PhaseStatus::Complete);
    }
    assert_phase_status(&state, Phase::ExtractInfo, PhaseStatus::Failed);
    assert_phase_status(&state, Phase::CompileOutput, PhaseStatus::Pending);

    let err = scripted
        .pipeline
        .reset_phase("c", "X", Phase::Initialize)
        .await
        .unwrap_err();
    assert!(matches!(err, TagflowError::Status(_)));
    assert_phase_status(
        &store.load("c", "X").await.unwrap(),
        Phase::Initialize,
        PhaseStatus::Complete,
    );
}

#[tokio::test]
async fn test_foreign_updates_are_dropped() {
    let store = Arc::new(InMemoryStateStore::new());
    let scripted = Scripted::new(store.clone());
    scripted.phase(Phase::Summarize).set_output(
        PhaseOutput::complete_with(ResultUpdate::Summary("mine".into())).with_update(
            ResultUpdate::Info(InfoExtraction {
                tags: vec!["stolen".into()],
                ..Default::default()
            }),
        ),
    );
    scripted
        .phase(Phase::ExtractInfo)
        .set_output(PhaseOutput::complete().with_final_output_path("nope.json"));

    let outcome = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();

    let result = assert_completed(&outcome);
    assert_eq!(result.summary.as_deref(), Some("mine"));
    assert!(result.tags.is_empty());
    let state = store.load("c", "X").await.unwrap();
    assert_eq!(
        state.final_output_path.as_deref(),
        Some(std::path::Path::new("out/X.json"))
    );
}

#[tokio::test]
async fn test_save_failures_do_not_abort_run() {
    let store = Arc::new(FailingStateStore::failing());
    let scripted = Scripted::new(store.clone());

    let outcome = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();

    match outcome {
        PipelineOutcome::Completed { unsaved_writes, .. } => {
            assert_eq!(unsaved_writes, Phase::ALL.len());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.failed_saves(), Phase::ALL.len());
    assert!(store.load("c", "X").await.is_none());
}

#[tokio::test]
async fn test_crash_after_lost_write_reruns_only_that_phase() {
    let store = Arc::new(FailingStateStore::default());
    let scripted = Scripted::new(store.clone());
    scripted
        .phase(Phase::Summarize)
        .set_output(PhaseOutput::failed(ErrorRecord::new("process_summarization", "x", 0)));
    scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();
    scripted.pipeline.reset_failed("c", "X").await.unwrap();
    scripted
        .phase(Phase::Summarize)
        .set_output(PhaseOutput::complete_with(ResultUpdate::Summary("s".into())));

    // Persisted: initialize and process_extraction. Everything after is lost.
    store.set_failing(true);
    scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();
    store.set_failing(false);

    let state = store.load("c", "X").await.unwrap();
    assert_completed_through(&state, &[Phase::Initialize, Phase::ExtractProcesses]);

    let outcome = scripted.pipeline.run("c", "X", &MediaItem::default()).await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(scripted.calls(), vec![1, 1, 3, 2, 2]);
}

#[tokio::test]
async fn test_run_from_source_fetches_input() {
    let store = Arc::new(InMemoryStateStore::new());
    let scripted = Scripted::new(store.clone());
    let source = StaticSource::new().with_item("X", figma_item());

    let outcome = scripted
        .pipeline
        .run_from_source(&source, "c", "X")
        .await
        .unwrap();
    assert!(outcome.is_complete());
    assert_eq!(source.fetch_count(), 1);

    let again = scripted
        .pipeline
        .run_from_source(&source, "c", "X")
        .await
        .unwrap();
    assert!(matches!(again, PipelineOutcome::AlreadyComplete { .. }));
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_without_status_change() {
    let store = Arc::new(InMemoryStateStore::new());
    let scripted = Scripted::new(store.clone());
    let source = StaticSource::new();

    let outcome = scripted
        .pipeline
        .run_from_source(&source, "c", "missing")
        .await
        .unwrap();

    assert_failed_in(&outcome, "fetch");
    assert_eq!(outcome.error().unwrap().retry_count, 1);
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(scripted.calls(), vec![0; 5]);

    let state = store.load("c", "missing").await.unwrap();
    assert_completed_through(&state, &[]);
    assert_eq!(state.errors().len(), 1);
    assert_eq!(state.errors()[0].phase, "fetch");
}

#[tokio::test]
async fn test_reset_requires_existing_record() {
    let scripted = Scripted::new(Arc::new(InMemoryStateStore::new()));
    let err = scripted
        .pipeline
        .reset_phase("c", "nothing", Phase::Summarize)
        .await
        .unwrap_err();
    assert!(matches!(err, TagflowError::Store(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn test_info_retry_exhaustion_completes_with_error() {
    let dir = TempDir::new().unwrap();
    let config = TagflowConfig::default()
        .with_output_dir(dir.path())
        .with_retry(fast_retry());
    let client = Arc::new(
        ScriptedInferenceClient::new()
            .respond(r#"{"processes": []}"#)
            .respond(r#"{"summary": "s"}"#)
            .fail(InferenceError::Timeout { seconds: 120 })
            .fail(InferenceError::Timeout { seconds: 120 }),
    );
    let store = Arc::new(InMemoryStateStore::new());
    let pipeline = PipelineBuilder::new(store.clone())
        .with_default_phases(client.clone(), &config)
        .build()
        .unwrap();

    let outcome = pipeline.run("c", "X", &figma_item()).await.unwrap();

    let result = assert_completed(&outcome);
    assert_eq!(result.tags, vec!["design"]);
    assert!(result.software.is_empty());
    assert!(result.error.is_some());
    let state = store.load("c", "X").await.unwrap();
    assert_eq!(state.errors()[0].phase, "info_extraction");
    assert_eq!(state.errors()[0].retry_count, 1);
    assert_eq!(client.call_count(), 4);
}

#[tokio::test]
async fn test_terminal_record_never_fetches() {
    let store = Arc::new(InMemoryStateStore::new());
    let mut state = StateRecord::new("c", "X");
    for phase in Phase::ALL {
        state.completion_status.mark(phase, PhaseStatus::Complete).unwrap();
    }
    store.insert(state);
    let scripted = Scripted::new(store.clone());

    let mut source = crate::source::MockMediaSource::new();
    source.expect_fetch().never();

    let outcome = scripted
        .pipeline
        .run_from_source(&source, "c", "X")
        .await
        .unwrap();
    assert!(matches!(outcome, PipelineOutcome::AlreadyComplete { .. }));
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn test_keys_differing_in_underscore_placement_resume_independently() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStateStore::new(dir.path()));
    let scripted = Scripted::new(store.clone());
    let item = figma_item();

    let first = scripted.pipeline.run("a", "b_c", &item).await.unwrap();
    assert!(matches!(first, PipelineOutcome::Completed { .. }));
    let second = scripted.pipeline.run("a_b", "c", &item).await.unwrap();
    assert!(matches!(second, PipelineOutcome::Completed { .. }));
    assert_eq!(scripted.calls(), vec![2; 5]);

    let again = scripted.pipeline.run("a", "b_c", &item).await.unwrap();
    assert!(matches!(again, PipelineOutcome::AlreadyComplete { .. }));
    assert_eq!(scripted.calls(), vec![2; 5]);
    assert!(store.load("a_b", "c").await.unwrap().is_terminal());
}
