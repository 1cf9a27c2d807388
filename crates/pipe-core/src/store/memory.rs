use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use log::debug;

use super::{CompletionOutcome, MetadataStore, NewExecution, PublishedOutput};
use crate::errors::StoreError;
use crate::model::{Artifact, ArtifactEvent, ArtifactId, CacheKey, CachingPolicy, EventKind, Execution, ExecutionId,
                   ExecutionState, PipelineScope};

#[derive(Debug, Default)]
struct Inner {
    artifacts: Vec<Artifact>,
    executions: Vec<Execution>,
}

impl Inner {
    fn execution_mut(&mut self, id: ExecutionId) -> Result<&mut Execution, StoreError> {
        index_of(id.0).and_then(|idx| self.executions.get_mut(idx))
                      .ok_or(StoreError::ExecutionNotFound(id))
    }

    fn artifact(&self, id: ArtifactId) -> Result<&Artifact, StoreError> {
        index_of(id.0).and_then(|idx| self.artifacts.get(idx))
                      .ok_or(StoreError::ArtifactNotFound(id))
    }

    fn running(&mut self, id: ExecutionId) -> Result<&mut Execution, StoreError> {
        let exec = self.execution_mut(id)?;
        if exec.state != ExecutionState::Running {
            return Err(StoreError::InvalidTransition { id,
                                                       state: exec.state.as_str().to_string() });
        }
        Ok(exec)
    }

    fn latest_reusable(&self,
                       component: &str,
                       key: &CacheKey,
                       scope: &PipelineScope,
                       exclude: Option<ExecutionId>)
                       -> Option<&Execution> {
        self.executions
            .iter()
            .rev()
            .filter(|e| Some(e.id) != exclude)
            .find(|e| e.component == component && &e.cache_key == key && &e.scope == scope && e.state.is_reusable())
    }
}

/// Los ids empiezan en 1; cualquier otro valor no tiene índice.
fn index_of(id: i64) -> Option<usize> {
    id.checked_sub(1).and_then(|i| usize::try_from(i).ok())
}

/// Store en memoria protegido por un `Mutex`: cada operación toma el lock
/// una sola vez, lo que la hace atómica frente a otros hilos.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    inner: Mutex<Inner>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn record_execution_start(&self, execution: NewExecution) -> Result<ExecutionId, StoreError> {
        let mut inner = self.lock()?;
        for e in &execution.inputs {
            inner.artifact(e.artifact_id)?;
        }
        let id = ExecutionId(inner.executions.len() as i64 + 1);
        inner.executions.push(Execution { id,
                                          run_id: execution.run_id,
                                          component: execution.component,
                                          scope: execution.scope,
                                          state: ExecutionState::Running,
                                          cache_key: execution.cache_key,
                                          caching: execution.caching,
                                          inputs: execution.inputs,
                                          outputs: Vec::new(),
                                          cached_from: None,
                                          error: None,
                                          started_at: Utc::now(),
                                          finished_at: None });
        debug!("memory:record_execution_start id={id}");
        Ok(id)
    }

    fn find_cached_execution(&self,
                             component: &str,
                             cache_key: &CacheKey,
                             scope: &PipelineScope)
                             -> Result<Option<Execution>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.latest_reusable(component, cache_key, scope, None).cloned())
    }

    fn complete_execution(&self,
                          id: ExecutionId,
                          outputs: Vec<PublishedOutput>)
                          -> Result<CompletionOutcome, StoreError> {
        let mut inner = self.lock()?;
        let exec = inner.running(id)?.clone();

        if exec.caching == CachingPolicy::Cacheable {
            let winner = inner.latest_reusable(&exec.component, &exec.cache_key, &exec.scope, Some(id))
                              .map(|w| (w.id, w.outputs.clone()));
            if let Some((winner, winner_outputs)) = winner {
                let target = inner.execution_mut(id)?;
                target.state = ExecutionState::Cached;
                target.cached_from = Some(winner);
                target.outputs = winner_outputs.clone();
                target.finished_at = Some(Utc::now());
                debug!("memory:complete_execution id={id} superseded by {winner}");
                return Ok(CompletionOutcome::Superseded { winner,
                                                          outputs: winner_outputs });
            }
        }

        for out in &outputs {
            if let PublishedOutput::Existing { artifact_id, .. } = out {
                inner.artifact(*artifact_id)?;
            }
        }

        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut events = Vec::with_capacity(outputs.len());
        let now = Utc::now();
        for out in outputs {
            let channel = out.channel().to_string();
            let position = positions.entry(channel.clone()).or_insert(0);
            let artifact_id = match out {
                PublishedOutput::Fresh { artifact, .. } => {
                    let aid = ArtifactId(inner.artifacts.len() as i64 + 1);
                    inner.artifacts.push(Artifact { id: aid,
                                                    type_name: artifact.type_name,
                                                    uri: artifact.uri,
                                                    fingerprint: artifact.fingerprint,
                                                    properties: artifact.properties,
                                                    payload: artifact.payload,
                                                    producer: Some(id),
                                                    created_at: now });
                    aid
                }
                PublishedOutput::Existing { artifact_id, .. } => artifact_id,
            };
            events.push(ArtifactEvent { kind: EventKind::Output,
                                        channel,
                                        position: *position,
                                        artifact_id });
            *position += 1;
        }

        let target = inner.execution_mut(id)?;
        target.state = ExecutionState::Complete;
        target.outputs = events.clone();
        target.finished_at = Some(now);
        debug!("memory:complete_execution id={id} outputs={}", events.len());
        Ok(CompletionOutcome::Published { outputs: events })
    }

    fn mark_cached(&self,
                   id: ExecutionId,
                   cached_from: ExecutionId,
                   outputs: &[ArtifactEvent])
                   -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for e in outputs {
            inner.artifact(e.artifact_id)?;
        }
        let exec = inner.running(id)?;
        exec.state = ExecutionState::Cached;
        exec.cached_from = Some(cached_from);
        exec.outputs = outputs.iter()
                              .map(|e| ArtifactEvent { kind: EventKind::Output,
                                                       ..e.clone() })
                              .collect();
        exec.finished_at = Some(Utc::now());
        Ok(())
    }

    fn fail_execution(&self, id: ExecutionId, error: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let exec = inner.running(id)?;
        exec.state = ExecutionState::Failed;
        exec.error = Some(error.to_string());
        exec.finished_at = Some(Utc::now());
        Ok(())
    }

    fn register_external_artifact(&self, type_name: &str, uri: &str, fingerprint: &str)
                                  -> Result<Artifact, StoreError> {
        let mut inner = self.lock()?;
        if let Some(found) = inner.artifacts.iter().rev().find(|a| {
                                                             a.producer.is_none()
                                                             && a.type_name == type_name
                                                             && a.uri == uri
                                                             && a.fingerprint == fingerprint
                                                         })
        {
            return Ok(found.clone());
        }
        let artifact = Artifact { id: ArtifactId(inner.artifacts.len() as i64 + 1),
                                  type_name: type_name.to_string(),
                                  uri: uri.to_string(),
                                  fingerprint: fingerprint.to_string(),
                                  properties: BTreeMap::new(),
                                  payload: serde_json::Value::Null,
                                  producer: None,
                                  created_at: Utc::now() };
        inner.artifacts.push(artifact.clone());
        debug!("memory:register_external_artifact id={} uri={uri}", artifact.id);
        Ok(artifact)
    }

    fn get_execution(&self, id: ExecutionId) -> Result<Execution, StoreError> {
        let mut inner = self.lock()?;
        inner.execution_mut(id).map(|e| e.clone())
    }

    fn get_artifacts(&self) -> Result<Vec<Artifact>, StoreError> {
        Ok(self.lock()?.artifacts.clone())
    }

    fn get_executions(&self) -> Result<Vec<Execution>, StoreError> {
        Ok(self.lock()?.executions.clone())
    }

    fn get_artifacts_by_id(&self, ids: &[ArtifactId]) -> Result<Vec<Artifact>, StoreError> {
        let inner = self.lock()?;
        ids.iter().map(|id| inner.artifact(*id).cloned()).collect()
    }

    fn get_artifacts_by_type(&self, type_name: &str) -> Result<Vec<Artifact>, StoreError> {
        Ok(self.lock()?
               .artifacts
               .iter()
               .filter(|a| a.type_name == type_name)
               .cloned()
               .collect())
    }
}
