//! Dos stores independientes sobre el mismo archivo (como dos procesos).

mod test_support;

use std::thread;

use pipe_core::model::{CacheKey, CachingPolicy};
use pipe_core::store::{CompletionOutcome, MetadataStore};
use test_support::{fresh, scope, sqlite_store, start};

#[test]
fn racing_completions_publish_once() {
    let dir = tempfile::tempdir().unwrap();
    let first = sqlite_store(dir.path());
    let second = sqlite_store(dir.path());

    let outcomes: Vec<CompletionOutcome> = thread::scope(|s| {
        let handles: Vec<_> = [&first, &second].into_iter()
                                                .map(|store| {
                                                    s.spawn(move || {
                                                         let id = start(store, "Trainer", "same", CachingPolicy::Cacheable);
                                                         store.complete_execution(id, vec![fresh("model", "Model", 1)])
                                                              .unwrap()
                                                     })
                                                })
                                                .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let published = outcomes.iter()
                            .filter(|o| matches!(o, CompletionOutcome::Published { .. }))
                            .count();
    assert_eq!(published, 1);
    assert_eq!(first.get_artifacts().unwrap().len(), 1);
    let hit = second.find_cached_execution("Trainer", &CacheKey("same".into()), &scope()).unwrap();
    assert!(hit.is_some());
}
