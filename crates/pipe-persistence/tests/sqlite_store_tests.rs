mod test_support;

use pipe_core::model::{ArtifactId, CacheKey, CachingPolicy, ExecutionState};
use pipe_core::store::{CompletionOutcome, MetadataStore, PublishedOutput};
use pipe_core::StoreError;
use test_support::{fresh, scope, sqlite_store, start};

#[test]
fn complete_then_lookup_returns_outputs_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(dir.path());
    let id = start(&store, "StatisticsGen", "k1", CachingPolicy::Cacheable);
    assert!(store.find_cached_execution("StatisticsGen", &CacheKey("k1".into()), &scope()).unwrap().is_none());

    let outcome = store.complete_execution(id,
                                           vec![fresh("statistics", "ExampleStatistics", 1),
                                                fresh("statistics", "ExampleStatistics", 2)])
                       .unwrap();
    assert!(matches!(outcome, CompletionOutcome::Published { .. }));

    let hit = store.find_cached_execution("StatisticsGen", &CacheKey("k1".into()), &scope())
                   .unwrap()
                   .expect("hit");
    assert_eq!(hit.id, id);
    assert_eq!(hit.state, ExecutionState::Complete);
    let positions: Vec<usize> = hit.outputs.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![0, 1]);

    let arts = store.get_artifacts_by_id(&hit.output_ids()).unwrap();
    assert_eq!(arts[0].payload["value"], 1);
    assert_eq!(arts[1].int_property("blessed"), Some(1));
    assert_eq!(arts[0].producer, Some(id));
}

#[test]
fn lookup_is_scoped_to_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(dir.path());
    let id = start(&store, "Trainer", "k", CachingPolicy::Cacheable);
    store.complete_execution(id, vec![fresh("model", "Model", 1)]).unwrap();
    let other = pipe_core::model::PipelineScope::new("taxi", "/tmp/elsewhere");
    assert!(store.find_cached_execution("Trainer", &CacheKey("k".into()), &other).unwrap().is_none());
}

#[test]
fn mark_cached_links_existing_outputs_without_new_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(dir.path());
    let first = start(&store, "Trainer", "k", CachingPolicy::Cacheable);
    let published = store.complete_execution(first, vec![fresh("model", "Model", 7)]).unwrap();

    let second = start(&store, "Trainer", "k", CachingPolicy::Cacheable);
    store.mark_cached(second, first, published.outputs()).unwrap();

    let exec = store.get_execution(second).unwrap();
    assert_eq!(exec.state, ExecutionState::Cached);
    assert_eq!(exec.cached_from, Some(first));
    assert_eq!(exec.output_ids(), store.get_execution(first).unwrap().output_ids());
    assert_eq!(store.get_artifacts().unwrap().len(), 1);
}

#[test]
fn superseded_completion_reuses_winner() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(dir.path());
    let a = start(&store, "Transform", "k", CachingPolicy::Cacheable);
    let b = start(&store, "Transform", "k", CachingPolicy::Cacheable);
    store.complete_execution(a, vec![fresh("transform_graph", "TransformGraph", 1)]).unwrap();
    let outcome = store.complete_execution(b, vec![fresh("transform_graph", "TransformGraph", 1)]).unwrap();
    assert!(matches!(outcome, CompletionOutcome::Superseded { winner, .. } if winner == a));
    assert_eq!(store.get_artifacts().unwrap().len(), 1);
    assert_eq!(store.get_execution(b).unwrap().state, ExecutionState::Cached);
}

#[test]
fn invalid_transitions_and_missing_ids_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(dir.path());
    let id = start(&store, "Pusher", "k", CachingPolicy::Cacheable);
    store.fail_execution(id, "push target unreachable").unwrap();
    assert_eq!(store.get_execution(id).unwrap().error.as_deref(), Some("push target unreachable"));

    assert!(matches!(store.fail_execution(id, "again"), Err(StoreError::InvalidTransition { .. })));
    assert!(matches!(store.get_artifacts_by_id(&[ArtifactId(99)]), Err(StoreError::ArtifactNotFound(_))));

    let other = start(&store, "Pusher", "k2", CachingPolicy::Cacheable);
    let missing = vec![PublishedOutput::Existing { channel: "pushed_model".into(),
                                                   artifact_id: ArtifactId(42) }];
    assert!(matches!(store.complete_execution(other, missing), Err(StoreError::ArtifactNotFound(_))));
    // la transacción fallida no dejó rastros
    assert_eq!(store.get_execution(other).unwrap().state, ExecutionState::Running);
}

#[test]
fn external_registration_is_idempotent_and_typed() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(dir.path());
    let a = store.register_external_artifact("ExternalArtifact", "/data/csv", "fp").unwrap();
    let b = store.register_external_artifact("ExternalArtifact", "/data/csv", "fp").unwrap();
    assert_eq!(a, b);
    assert!(a.producer.is_none());
    store.register_external_artifact("Schema", "/data/schema", "fp2").unwrap();
    assert_eq!(store.get_artifacts_by_type("Schema").unwrap().len(), 1);
    assert_eq!(store.get_artifacts().unwrap().len(), 2);
}

#[test]
fn data_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = sqlite_store(dir.path());
        let id = start(&store, "Evaluator", "k", CachingPolicy::Cacheable);
        store.complete_execution(id, vec![fresh("blessing", "ModelBlessing", 1)]).unwrap();
        id
    };
    let reopened = sqlite_store(dir.path());
    let hit = reopened.find_cached_execution("Evaluator", &CacheKey("k".into()), &scope())
                      .unwrap()
                      .expect("persisted");
    assert_eq!(hit.id, id);
    assert_eq!(reopened.get_executions().unwrap().len(), 1);
}
