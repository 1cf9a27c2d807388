#![allow(dead_code)]

use std::path::Path;

use pipe_core::model::{CacheKey, CachingPolicy, ExecutionId, PipelineScope};
use pipe_core::store::{MetadataStore, NewArtifact, NewExecution, PublishedOutput};
use pipe_persistence::{build_pool, PoolProvider, SqliteMetadataStore};
use serde_json::json;
use uuid::Uuid;

/// Store SQLite sobre un archivo nuevo dentro de `dir`.
pub fn sqlite_store(dir: &Path) -> SqliteMetadataStore<PoolProvider> {
    let pool = build_pool(&dir.join("metadata.sqlite"), 2, 5_000).expect("pool");
    SqliteMetadataStore::new(PoolProvider { pool })
}

pub fn scope() -> PipelineScope {
    PipelineScope::new("taxi", "/tmp/taxi")
}

pub fn start(store: &dyn MetadataStore, component: &str, key: &str, caching: CachingPolicy) -> ExecutionId {
    store.record_execution_start(NewExecution { run_id: Uuid::new_v4(),
                                                component: component.into(),
                                                scope: scope(),
                                                cache_key: CacheKey(key.into()),
                                                caching,
                                                inputs: vec![] })
         .expect("start")
}

pub fn fresh(channel: &str, type_name: &str, value: i64) -> PublishedOutput {
    PublishedOutput::Fresh { channel: channel.into(),
                             artifact: NewArtifact { type_name: type_name.into(),
                                                     uri: format!("/tmp/taxi/{channel}/{value}"),
                                                     fingerprint: format!("fp-{value}"),
                                                     properties: [("blessed".to_string(), json!(1))].into_iter()
                                                                                                     .collect(),
                                                     payload: json!({ "value": value }) } }
}
