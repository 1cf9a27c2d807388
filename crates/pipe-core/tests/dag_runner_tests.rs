mod common;

use std::sync::atomic::{AtomicBool, Ordering};

use common::{sum_pipeline, Calls, Failing, Source, Sum};
use pipe_core::constants::{EXECUTION_RECORD_FILE, PAYLOAD_FILE};
use pipe_core::store::{CompletionOutcome, NewExecution, PublishedOutput};
use pipe_core::{Artifact, ArtifactDraft, ArtifactId, CacheKey, CachingPolicy, Component, ComponentOutputs,
                ComponentRunResult, ComponentSpec, DagRunner, DefinitionError, EngineError, Execution,
                ExecutionContext, ExecutionId, ExecutionState, InMemoryMetadataStore, MetadataStore, PipelineBuilder,
                PipelineScope, Scheduling, StoreError};
use serde_json::json;

#[test]
fn cycles_are_rejected_before_running() {
    let err = PipelineBuilder::new("cyc").component(ComponentSpec::new("a").input("x", "Numbers", "b", "out")
                                                                          .output("out", "Numbers"),
                                                    Source::default())
                                         .component(ComponentSpec::new("b").input("x", "Numbers", "a", "out")
                                                                          .output("out", "Numbers"),
                                                    Source::default())
                                         .build()
                                         .unwrap_err();
    assert!(matches!(err, DefinitionError::Cycle { ref path } if path.len() == 3));
}

#[test]
fn type_mismatch_is_a_definition_error() {
    let err = PipelineBuilder::new("bad").component(ComponentSpec::new("source").output("numbers", "Numbers"),
                                                    Source::default())
                                         .component(ComponentSpec::new("sum").input("numbers", "Total", "source", "numbers")
                                                                            .output("total", "Total"),
                                                    Sum::default())
                                         .build()
                                         .unwrap_err();
    assert!(matches!(err, DefinitionError::TypeMismatch { .. }));
}

#[test]
fn disabled_cache_forces_fresh_executions() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryMetadataStore::new();
    let runner = DagRunner::new(&store);
    runner.run(&sum_pipeline(3, Source::default(), Sum::default()), dir.path()).unwrap();

    let calls = Calls::default();
    let mut forced = sum_pipeline(3, Source { calls: calls.clone(), delay_ms: 0 }, Sum::default());
    forced.enable_cache = false;
    let result = runner.run(&forced, dir.path()).unwrap();
    assert_eq!(result.count_in_state(ExecutionState::Complete), 2);
    assert_eq!(calls.get(), 1);
    assert_eq!(store.get_artifacts().unwrap().len(), 4);
}

#[test]
fn layout_has_payloads_and_execution_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryMetadataStore::new();
    let runner = DagRunner::new(&store);
    let first = runner.run(&sum_pipeline(3, Source::default(), Sum::default()), dir.path()).unwrap();
    let source = first.outcome("source").unwrap();
    let uri = std::path::PathBuf::from(&source.output("numbers")[0].uri);
    assert_eq!(uri, dir.path().join("source").join("numbers").join(source.execution_id.to_string()));
    assert!(uri.join(PAYLOAD_FILE).is_file());

    let second = runner.run(&sum_pipeline(3, Source::default(), Sum::default()), dir.path()).unwrap();
    let cached = second.outcome("source").unwrap();
    let exec_dir = dir.path()
                      .join("source")
                      .join(".system")
                      .join("executions")
                      .join(cached.execution_id.to_string());
    assert!(exec_dir.join(EXECUTION_RECORD_FILE).is_file());
    // una ejecución cacheada no crea directorios de canal
    assert!(!dir.path().join("source").join("numbers").join(cached.execution_id.to_string()).exists());
}

#[test]
fn run_result_carries_the_definition_hash() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryMetadataStore::new();
    let runner = DagRunner::new(&store);
    let first = runner.run(&sum_pipeline(3, Source::default(), Sum::default()), dir.path()).unwrap();
    let again = runner.run(&sum_pipeline(3, Source::default(), Sum::default()), dir.path()).unwrap();
    // otra config del source cambia la forma del pipeline
    let changed = sum_pipeline(4, Source::default(), Sum::default());

    assert_eq!(first.definition_hash, sum_pipeline(3, Source::default(), Sum::default()).definition_hash());
    assert_eq!(first.definition_hash, again.definition_hash);
    assert_ne!(first.definition_hash, changed.definition_hash());
    assert_ne!(first.run_id, again.run_id);
    assert!(first.started_at <= again.started_at);
}

#[derive(Debug, Default)]
struct Undeclared;

impl Component for Undeclared {
    fn run(&self, _ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        ComponentRunResult::success(ComponentOutputs::new().fresh("nope", ArtifactDraft::new("Numbers", json!({}))))
    }
}

#[test]
fn failure_blocks_dependents_but_not_independent_components() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryMetadataStore::new();
    let independent = Calls::default();
    let dependent = Calls::default();
    let pipeline =
        PipelineBuilder::new("fail").component(ComponentSpec::new("broken").output("numbers", "Numbers"), Failing)
                                    .component(ComponentSpec::new("after").input("numbers", "Numbers", "broken", "numbers")
                                                                         .output("total", "Total"),
                                               Sum { calls: dependent.clone() })
                                    .component(ComponentSpec::new("other").output("numbers", "Numbers"),
                                               Source { calls: independent.clone(),
                                                        delay_ms: 0 })
                                    .build()
                                    .unwrap();

    let err = DagRunner::new(&store).run(&pipeline, dir.path()).unwrap_err();
    assert!(matches!(err, EngineError::ComponentFailure { ref component, .. } if component == "broken"));
    assert_eq!(independent.get(), 1);
    assert_eq!(dependent.get(), 0);

    let executions = store.get_executions().unwrap();
    assert_eq!(executions.len(), 2);
    let broken = executions.iter().find(|e| e.component == "broken").unwrap();
    assert_eq!(broken.state, ExecutionState::Failed);
    assert_eq!(broken.error.as_deref(), Some("boom"));
    assert!(executions.iter().all(|e| e.component != "after"));
}

#[test]
fn undeclared_output_channel_fails_the_component() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryMetadataStore::new();
    let pipeline = PipelineBuilder::new("undeclared").component(ComponentSpec::new("c").output("numbers", "Numbers"),
                                                                Undeclared)
                                                     .build()
                                                     .unwrap();
    let err = DagRunner::new(&store).run(&pipeline, dir.path()).unwrap_err();
    assert!(matches!(err, EngineError::ComponentFailure { .. }));
    assert_eq!(store.get_executions().unwrap()[0].state, ExecutionState::Failed);
    assert!(store.get_artifacts().unwrap().is_empty());
}

#[derive(Debug, Default)]
struct DanglingRef;

impl Component for DanglingRef {
    fn run(&self, _ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        ComponentRunResult::success(ComponentOutputs::new().existing("numbers", ArtifactId(999)))
    }
}

#[test]
fn unknown_existing_artifact_fails_the_component_without_aborting_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryMetadataStore::new();
    let sibling = Calls::default();
    let pipeline =
        PipelineBuilder::new("dangling").component(ComponentSpec::new("bad_ref").output("numbers", "Numbers"),
                                                   DanglingRef)
                                        .component(ComponentSpec::new("other").output("numbers", "Numbers"),
                                                   Source { calls: sibling.clone(),
                                                            delay_ms: 0 })
                                        .build()
                                        .unwrap();

    let err = DagRunner::new(&store).run(&pipeline, dir.path()).unwrap_err();
    assert!(matches!(err, EngineError::ComponentFailure { ref component, .. } if component == "bad_ref"));
    assert!(!err.is_fatal());
    assert_eq!(sibling.get(), 1);

    let executions = store.get_executions().unwrap();
    let bad = executions.iter().find(|e| e.component == "bad_ref").unwrap();
    assert_eq!(bad.state, ExecutionState::Failed);
    assert!(bad.error.as_deref().unwrap().contains("unknown artifact"));
    assert!(bad.outputs.is_empty());
}

#[test]
fn failed_executions_are_never_cache_hits() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryMetadataStore::new();
    let build = || {
        PipelineBuilder::new("retry").component(ComponentSpec::new("broken").output("numbers", "Numbers"), Failing)
                                     .build()
                                     .unwrap()
    };
    let runner = DagRunner::new(&store);
    assert!(runner.run(&build(), dir.path()).is_err());
    assert!(runner.run(&build(), dir.path()).is_err());
    let states: Vec<ExecutionState> = store.get_executions().unwrap().iter().map(|e| e.state).collect();
    assert_eq!(states, vec![ExecutionState::Failed, ExecutionState::Failed]);
}

#[test]
fn parallel_scheduling_matches_sequential_results() {
    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();
    let seq_store = InMemoryMetadataStore::new();
    let par_store = InMemoryMetadataStore::new();

    let seq = DagRunner::new(&seq_store).run(&sum_pipeline(4, Source::default(), Sum::default()), seq_dir.path())
                                        .unwrap();
    let par = DagRunner::new(&par_store).with_scheduling(Scheduling::Parallel { threads: 2 })
                                        .run(&sum_pipeline(4, Source::default(), Sum::default()), par_dir.path())
                                        .unwrap();

    let names = |r: &pipe_core::PipelineRunResult| r.outcomes.iter().map(|o| o.component.clone()).collect::<Vec<_>>();
    assert_eq!(names(&seq), names(&par));
    let fp = |r: &pipe_core::PipelineRunResult| r.outcome("sum").unwrap().output("total")[0].fingerprint.clone();
    assert_eq!(fp(&seq), fp(&par));
}

/// Store que deja de responder al publicar.
struct FlakyStore {
    inner: InMemoryMetadataStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

impl MetadataStore for FlakyStore {
    fn record_execution_start(&self, execution: NewExecution) -> Result<ExecutionId, StoreError> {
        self.inner.record_execution_start(execution)
    }
    fn find_cached_execution(&self, component: &str, key: &CacheKey, scope: &PipelineScope)
                             -> Result<Option<Execution>, StoreError> {
        self.inner.find_cached_execution(component, key, scope)
    }
    fn complete_execution(&self, id: ExecutionId, outputs: Vec<PublishedOutput>) -> Result<CompletionOutcome, StoreError> {
        self.check()?;
        self.inner.complete_execution(id, outputs)
    }
    fn mark_cached(&self, id: ExecutionId, from: ExecutionId, outputs: &[pipe_core::model::ArtifactEvent])
                   -> Result<(), StoreError> {
        self.check()?;
        self.inner.mark_cached(id, from, outputs)
    }
    fn fail_execution(&self, id: ExecutionId, error: &str) -> Result<(), StoreError> {
        self.inner.fail_execution(id, error)
    }
    fn register_external_artifact(&self, type_name: &str, uri: &str, fingerprint: &str) -> Result<Artifact, StoreError> {
        self.inner.register_external_artifact(type_name, uri, fingerprint)
    }
    fn get_execution(&self, id: ExecutionId) -> Result<Execution, StoreError> {
        self.inner.get_execution(id)
    }
    fn get_artifacts(&self) -> Result<Vec<Artifact>, StoreError> {
        self.inner.get_artifacts()
    }
    fn get_executions(&self) -> Result<Vec<Execution>, StoreError> {
        self.inner.get_executions()
    }
    fn get_artifacts_by_id(&self, ids: &[ArtifactId]) -> Result<Vec<Artifact>, StoreError> {
        self.inner.get_artifacts_by_id(ids)
    }
    fn get_artifacts_by_type(&self, type_name: &str) -> Result<Vec<Artifact>, StoreError> {
        self.inner.get_artifacts_by_type(type_name)
    }
}

#[test]
fn store_unavailable_aborts_the_run_and_leaves_execution_running() {
    let dir = tempfile::tempdir().unwrap();
    let store = FlakyStore { inner: InMemoryMetadataStore::new(),
                             down: AtomicBool::new(true) };
    let sum_calls = Calls::default();
    let err = DagRunner::new(&store).run(&sum_pipeline(3, Source::default(), Sum { calls: sum_calls.clone() }),
                                         dir.path())
                                    .unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Unavailable(_))));
    assert!(err.is_fatal());
    assert_eq!(sum_calls.get(), 0);
    let executions = store.get_executions().unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].state, ExecutionState::Running);
    assert!(store.get_artifacts().unwrap().is_empty());
}

#[test]
fn always_fresh_components_skip_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryMetadataStore::new();
    let calls = Calls::default();
    let build = || {
        PipelineBuilder::new("fresh").component(ComponentSpec::new("source").output("numbers", "Numbers")
                                                                           .caching(CachingPolicy::AlwaysFresh),
                                                Source { calls: calls.clone(),
                                                         delay_ms: 0 })
                                     .build()
                                     .unwrap()
    };
    let runner = DagRunner::new(&store);
    runner.run(&build(), dir.path()).unwrap();
    let second = runner.run(&build(), dir.path()).unwrap();
    assert_eq!(second.outcome("source").unwrap().state, ExecutionState::Complete);
    assert_eq!(calls.get(), 2);
}
