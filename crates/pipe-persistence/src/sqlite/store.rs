use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;
use pipe_core::model::{Artifact, ArtifactEvent, ArtifactId, CacheKey, CachingPolicy, EventKind, Execution,
                       ExecutionId, ExecutionState, PipelineScope};
use pipe_core::store::{CompletionOutcome, MetadataStore, NewExecution, PublishedOutput};
use pipe_core::StoreError;

use super::rows::{now_text, to_json_text, ArtifactRow, EventRow, ExecutionRow, NewArtifactRow, NewEventRow,
                  NewExecutionRow};
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{artifacts, events, executions};

const REUSABLE_STATES: [&str; 2] = ["complete", "cached"];

/// `MetadataStore` sobre SQLite.
///
/// Cada operación abre su propia transacción `IMMEDIATE`; nada queda a
/// medio escribir si el proceso muere entre operaciones.
pub struct SqliteMetadataStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> SqliteMetadataStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Unidad de trabajo transaccional con reintento ante `database is locked`.
    fn write<T, F>(&self, op: &str, mut f: F) -> Result<T, StoreError>
        where F: FnMut(&mut SqliteConnection) -> Result<T, PersistenceError>
    {
        debug!("sqlite:{op}:start");
        let r = with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.immediate_transaction(|tx| f(tx))
        });
        debug!("sqlite:{op}:done ok={}", r.is_ok());
        r.map_err(StoreError::from)
    }

    fn read<T, F>(&self, mut f: F) -> Result<T, StoreError>
        where F: FnMut(&mut SqliteConnection) -> Result<T, PersistenceError>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            f(&mut conn)
        }).map_err(StoreError::from)
    }
}

fn load_execution(conn: &mut SqliteConnection, id: ExecutionId) -> Result<Execution, PersistenceError> {
    let row: ExecutionRow = executions::table.find(id.0)
                                             .first(conn)
                                             .optional()?
                                             .ok_or(PersistenceError::ExecutionNotFound(id))?;
    hydrate(conn, row)
}

fn hydrate(conn: &mut SqliteConnection, row: ExecutionRow) -> Result<Execution, PersistenceError> {
    let event_rows: Vec<EventRow> = events::table.filter(events::execution_id.eq(row.id))
                                                 .order((events::direction.asc(),
                                                         events::channel.asc(),
                                                         events::position.asc(),
                                                         events::id.asc()))
                                                 .load(conn)?;
    row.into_execution(event_rows)
}

fn running(conn: &mut SqliteConnection, id: ExecutionId) -> Result<ExecutionRow, PersistenceError> {
    let row: ExecutionRow = executions::table.find(id.0)
                                             .first(conn)
                                             .optional()?
                                             .ok_or(PersistenceError::ExecutionNotFound(id))?;
    let state = row.execution_state()?;
    if state != ExecutionState::Running {
        return Err(PersistenceError::InvalidTransition { id,
                                                         state: state.as_str().to_string() });
    }
    Ok(row)
}

fn ensure_artifacts(conn: &mut SqliteConnection, ids: impl IntoIterator<Item = ArtifactId>) -> Result<(), PersistenceError> {
    for id in ids {
        let found: i64 = artifacts::table.filter(artifacts::id.eq(id.0)).count().get_result(conn)?;
        if found == 0 {
            return Err(PersistenceError::ArtifactNotFound(id));
        }
    }
    Ok(())
}

fn latest_reusable(conn: &mut SqliteConnection,
                   component: &str,
                   key: &str,
                   pipeline_name: &str,
                   pipeline_root: &str,
                   exclude: Option<i64>)
                   -> Result<Option<ExecutionRow>, PersistenceError> {
    let mut query = executions::table.filter(executions::component.eq(component))
                                     .filter(executions::cache_key.eq(key))
                                     .filter(executions::pipeline_name.eq(pipeline_name))
                                     .filter(executions::pipeline_root.eq(pipeline_root))
                                     .filter(executions::state.eq_any(REUSABLE_STATES))
                                     .into_boxed();
    if let Some(id) = exclude {
        query = query.filter(executions::id.ne(id));
    }
    Ok(query.order(executions::id.desc()).first(conn).optional()?)
}

fn insert_events(conn: &mut SqliteConnection, id: ExecutionId, evs: &[ArtifactEvent]) -> Result<(), PersistenceError> {
    for e in evs {
        diesel::insert_into(events::table).values(NewEventRow::from_event(id, e)?)
                                          .execute(conn)?;
    }
    Ok(())
}

fn load_artifacts(conn: &mut SqliteConnection, ids: &[ArtifactId]) -> Result<Vec<Artifact>, PersistenceError> {
    let raw: Vec<i64> = ids.iter().map(|i| i.0).collect();
    let rows: Vec<ArtifactRow> = artifacts::table.filter(artifacts::id.eq_any(&raw)).load(conn)?;
    let mut by_id = std::collections::HashMap::with_capacity(rows.len());
    for row in rows {
        let a = row.into_artifact()?;
        by_id.insert(a.id, a);
    }
    ids.iter()
       .map(|id| by_id.get(id).cloned().ok_or(PersistenceError::ArtifactNotFound(*id)))
       .collect()
}

impl<P: ConnectionProvider> MetadataStore for SqliteMetadataStore<P> {
    fn record_execution_start(&self, execution: NewExecution) -> Result<ExecutionId, StoreError> {
        let root = execution.scope.root_str();
        self.write("record_execution_start", |conn| {
                ensure_artifacts(conn, execution.inputs.iter().map(|e| e.artifact_id))?;
                let row = NewExecutionRow { run_id: execution.run_id.to_string(),
                                            component: &execution.component,
                                            pipeline_name: &execution.scope.pipeline_name,
                                            pipeline_root: root.clone(),
                                            cache_key: execution.cache_key.as_str(),
                                            caching: execution.caching.as_str(),
                                            state: ExecutionState::Running.as_str(),
                                            started_at: now_text() };
                let id: i64 = diesel::insert_into(executions::table).values(&row)
                                                                    .returning(executions::id)
                                                                    .get_result(conn)?;
                insert_events(conn, ExecutionId(id), &execution.inputs)?;
                Ok(ExecutionId(id))
            })
    }

    fn find_cached_execution(&self,
                             component: &str,
                             cache_key: &CacheKey,
                             scope: &PipelineScope)
                             -> Result<Option<Execution>, StoreError> {
        let root = scope.root_str();
        self.read(|conn| {
                match latest_reusable(conn, component, cache_key.as_str(), &scope.pipeline_name, &root, None)? {
                    Some(row) => hydrate(conn, row).map(Some),
                    None => Ok(None),
                }
            })
    }

    fn complete_execution(&self,
                          id: ExecutionId,
                          outputs: Vec<PublishedOutput>)
                          -> Result<CompletionOutcome, StoreError> {
        self.write("complete_execution", |conn| {
                let row = running(conn, id)?;
                let now = now_text();

                if row.caching_policy()? == CachingPolicy::Cacheable {
                    let winner = latest_reusable(conn,
                                                 &row.component,
                                                 &row.cache_key,
                                                 &row.pipeline_name,
                                                 &row.pipeline_root,
                                                 Some(row.id))?;
                    if let Some(winner) = winner {
                        let winner = hydrate(conn, winner)?;
                        insert_events(conn, id, &winner.outputs)?;
                        diesel::update(executions::table.find(id.0)).set((executions::state.eq(ExecutionState::Cached.as_str()),
                                                                         executions::cached_from.eq(Some(winner.id.0)),
                                                                         executions::finished_at.eq(Some(now.clone()))))
                                                                    .execute(conn)?;
                        return Ok(CompletionOutcome::Superseded { winner: winner.id,
                                                                  outputs: winner.outputs });
                    }
                }

                ensure_artifacts(conn,
                                 outputs.iter().filter_map(|o| match o {
                                                   PublishedOutput::Existing { artifact_id, .. } => Some(*artifact_id),
                                                   PublishedOutput::Fresh { .. } => None,
                                               }))?;

                let mut positions: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
                let mut published = Vec::with_capacity(outputs.len());
                for out in &outputs {
                    let position = positions.entry(out.channel()).or_insert(0);
                    let artifact_id = match out {
                        PublishedOutput::Fresh { artifact, .. } => {
                            let new_row = NewArtifactRow { type_name: &artifact.type_name,
                                                           uri: &artifact.uri,
                                                           fingerprint: &artifact.fingerprint,
                                                           properties: to_json_text(&artifact.properties)?,
                                                           payload: to_json_text(&artifact.payload)?,
                                                           producer_execution: Some(id.0),
                                                           created_at: now.clone() };
                            let aid: i64 = diesel::insert_into(artifacts::table).values(&new_row)
                                                                                .returning(artifacts::id)
                                                                                .get_result(conn)?;
                            ArtifactId(aid)
                        }
                        PublishedOutput::Existing { artifact_id, .. } => *artifact_id,
                    };
                    published.push(ArtifactEvent { kind: EventKind::Output,
                                                   channel: out.channel().to_string(),
                                                   position: *position,
                                                   artifact_id });
                    *position += 1;
                }
                insert_events(conn, id, &published)?;
                diesel::update(executions::table.find(id.0)).set((executions::state.eq(ExecutionState::Complete.as_str()),
                                                                 executions::finished_at.eq(Some(now))))
                                                            .execute(conn)?;
                Ok(CompletionOutcome::Published { outputs: published })
            })
    }

    fn mark_cached(&self,
                   id: ExecutionId,
                   cached_from: ExecutionId,
                   outputs: &[ArtifactEvent])
                   -> Result<(), StoreError> {
        self.write("mark_cached", |conn| {
                running(conn, id)?;
                ensure_artifacts(conn, outputs.iter().map(|e| e.artifact_id))?;
                let evs: Vec<ArtifactEvent> = outputs.iter()
                                                     .map(|e| ArtifactEvent { kind: EventKind::Output,
                                                                              ..e.clone() })
                                                     .collect();
                insert_events(conn, id, &evs)?;
                diesel::update(executions::table.find(id.0)).set((executions::state.eq(ExecutionState::Cached.as_str()),
                                                                 executions::cached_from.eq(Some(cached_from.0)),
                                                                 executions::finished_at.eq(Some(now_text()))))
                                                            .execute(conn)?;
                Ok(())
            })
    }

    fn fail_execution(&self, id: ExecutionId, error: &str) -> Result<(), StoreError> {
        self.write("fail_execution", |conn| {
                running(conn, id)?;
                diesel::update(executions::table.find(id.0)).set((executions::state.eq(ExecutionState::Failed.as_str()),
                                                                 executions::error.eq(Some(error)),
                                                                 executions::finished_at.eq(Some(now_text()))))
                                                            .execute(conn)?;
                Ok(())
            })
    }

    fn register_external_artifact(&self, type_name: &str, uri: &str, fingerprint: &str)
                                  -> Result<Artifact, StoreError> {
        self.write("register_external_artifact", |conn| {
                let existing: Option<ArtifactRow> = artifacts::table.filter(artifacts::type_name.eq(type_name))
                                                                    .filter(artifacts::uri.eq(uri))
                                                                    .filter(artifacts::fingerprint.eq(fingerprint))
                                                                    .filter(artifacts::producer_execution.is_null())
                                                                    .order(artifacts::id.desc())
                                                                    .first(conn)
                                                                    .optional()?;
                if let Some(row) = existing {
                    return row.into_artifact();
                }
                let row = NewArtifactRow { type_name,
                                           uri,
                                           fingerprint,
                                           properties: "{}".to_string(),
                                           payload: "null".to_string(),
                                           producer_execution: None,
                                           created_at: now_text() };
                let id: i64 = diesel::insert_into(artifacts::table).values(&row)
                                                                   .returning(artifacts::id)
                                                                   .get_result(conn)?;
                let stored: ArtifactRow = artifacts::table.find(id).first(conn)?;
                stored.into_artifact()
            })
    }

    fn get_execution(&self, id: ExecutionId) -> Result<Execution, StoreError> {
        self.read(|conn| load_execution(conn, id))
    }

    fn get_artifacts(&self) -> Result<Vec<Artifact>, StoreError> {
        self.read(|conn| {
                let rows: Vec<ArtifactRow> = artifacts::table.order(artifacts::id.asc()).load(conn)?;
                rows.into_iter().map(ArtifactRow::into_artifact).collect()
            })
    }

    fn get_executions(&self) -> Result<Vec<Execution>, StoreError> {
        self.read(|conn| {
                let rows: Vec<ExecutionRow> = executions::table.order(executions::id.asc()).load(conn)?;
                rows.into_iter().map(|row| hydrate(conn, row)).collect()
            })
    }

    fn get_artifacts_by_id(&self, ids: &[ArtifactId]) -> Result<Vec<Artifact>, StoreError> {
        self.read(|conn| load_artifacts(conn, ids))
    }

    fn get_artifacts_by_type(&self, type_name: &str) -> Result<Vec<Artifact>, StoreError> {
        self.read(|conn| {
                let rows: Vec<ArtifactRow> = artifacts::table.filter(artifacts::type_name.eq(type_name))
                                                             .order(artifacts::id.asc())
                                                             .load(conn)?;
                rows.into_iter().map(ArtifactRow::into_artifact).collect()
            })
    }
}
