//! Filas Diesel y su mapeo a los modelos del core.
//!
//! JSON, uuid y timestamps se guardan como TEXT (timestamps en RFC3339).
//! Un valor que no se puede reconstruir es `PersistenceError::Corrupt`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use pipe_core::model::{Artifact, ArtifactEvent, ArtifactId, CacheKey, CachingPolicy, EventKind, Execution,
                       ExecutionId, ExecutionState, PipelineScope};
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::schema::{artifacts, events, executions};

#[derive(Queryable, Debug)]
pub(crate) struct ExecutionRow {
    pub id: i64,
    pub run_id: String,
    pub component: String,
    pub pipeline_name: String,
    pub pipeline_root: String,
    pub cache_key: String,
    pub caching: String,
    pub state: String,
    pub cached_from: Option<i64>,
    pub error: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = executions)]
pub(crate) struct NewExecutionRow<'a> {
    pub run_id: String,
    pub component: &'a str,
    pub pipeline_name: &'a str,
    pub pipeline_root: String,
    pub cache_key: &'a str,
    pub caching: &'static str,
    pub state: &'static str,
    pub started_at: String,
}

#[derive(Queryable, Debug)]
pub(crate) struct ArtifactRow {
    pub id: i64,
    pub type_name: String,
    pub uri: String,
    pub fingerprint: String,
    pub properties: String,
    pub payload: String,
    pub producer_execution: Option<i64>,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = artifacts)]
pub(crate) struct NewArtifactRow<'a> {
    pub type_name: &'a str,
    pub uri: &'a str,
    pub fingerprint: &'a str,
    pub properties: String,
    pub payload: String,
    pub producer_execution: Option<i64>,
    pub created_at: String,
}

#[derive(Queryable, Debug)]
pub(crate) struct EventRow {
    pub _id: i64,
    pub _execution_id: i64,
    pub artifact_id: i64,
    pub direction: String,
    pub channel: String,
    pub position: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = events)]
pub(crate) struct NewEventRow<'a> {
    pub execution_id: i64,
    pub artifact_id: i64,
    pub direction: &'static str,
    pub channel: &'a str,
    pub position: i32,
}

impl<'a> NewEventRow<'a> {
    pub fn from_event(execution_id: ExecutionId, event: &'a ArtifactEvent) -> Result<Self, PersistenceError> {
        Ok(Self { execution_id: execution_id.0,
                  artifact_id: event.artifact_id.0,
                  direction: event.kind.as_str(),
                  channel: &event.channel,
                  position: i32::try_from(event.position).map_err(|_| {
                                                              PersistenceError::Corrupt(format!("position {} out of range",
                                                                                                event.position))
                                                          })? })
    }
}

pub(crate) fn now_text() -> String {
    Utc::now().to_rfc3339()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
                                     .map_err(|e| PersistenceError::Corrupt(format!("timestamp '{raw}': {e}")))
}

impl EventRow {
    pub fn into_event(self) -> Result<ArtifactEvent, PersistenceError> {
        let kind = EventKind::parse(&self.direction).ok_or_else(|| {
                                                        PersistenceError::Corrupt(format!("event direction '{}'",
                                                                                          self.direction))
                                                    })?;
        Ok(ArtifactEvent { kind,
                           channel: self.channel,
                           position: usize::try_from(self.position).map_err(|_| {
                                                                       PersistenceError::Corrupt(format!("event position {}",
                                                                                                         self.position))
                                                                   })?,
                           artifact_id: ArtifactId(self.artifact_id) })
    }
}

impl ExecutionRow {
    pub fn caching_policy(&self) -> Result<CachingPolicy, PersistenceError> {
        CachingPolicy::parse(&self.caching).ok_or_else(|| PersistenceError::Corrupt(format!("caching '{}'", self.caching)))
    }

    pub fn execution_state(&self) -> Result<ExecutionState, PersistenceError> {
        ExecutionState::parse(&self.state).ok_or_else(|| PersistenceError::Corrupt(format!("state '{}'", self.state)))
    }

    /// Reconstruye la ejecución con sus eventos (ya ordenados por canal y
    /// posición).
    pub fn into_execution(self, events: Vec<EventRow>) -> Result<Execution, PersistenceError> {
        let caching = self.caching_policy()?;
        let state = self.execution_state()?;
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for row in events {
            let event = row.into_event()?;
            match event.kind {
                EventKind::Input => inputs.push(event),
                EventKind::Output => outputs.push(event),
            }
        }
        let run_id =
            Uuid::parse_str(&self.run_id).map_err(|e| PersistenceError::Corrupt(format!("run_id '{}': {e}", self.run_id)))?;
        Ok(Execution { id: ExecutionId(self.id),
                       run_id,
                       component: self.component,
                       scope: PipelineScope { pipeline_name: self.pipeline_name,
                                              pipeline_root: PathBuf::from(self.pipeline_root) },
                       state,
                       cache_key: CacheKey(self.cache_key),
                       caching,
                       inputs,
                       outputs,
                       cached_from: self.cached_from.map(ExecutionId),
                       error: self.error,
                       started_at: parse_ts(&self.started_at)?,
                       finished_at: self.finished_at.as_deref().map(parse_ts).transpose()? })
    }
}

impl ArtifactRow {
    pub fn into_artifact(self) -> Result<Artifact, PersistenceError> {
        let properties: BTreeMap<String, Value> =
            serde_json::from_str(&self.properties).map_err(|e| {
                                                      PersistenceError::Corrupt(format!("artifact {} properties: {e}",
                                                                                        self.id))
                                                  })?;
        let payload: Value = serde_json::from_str(&self.payload).map_err(|e| {
                                                                    PersistenceError::Corrupt(format!("artifact {} payload: {e}",
                                                                                                      self.id))
                                                                })?;
        Ok(Artifact { id: ArtifactId(self.id),
                      type_name: self.type_name,
                      uri: self.uri,
                      fingerprint: self.fingerprint,
                      properties,
                      payload,
                      producer: self.producer_execution.map(ExecutionId),
                      created_at: parse_ts(&self.created_at)? })
    }
}

pub(crate) fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|e| PersistenceError::Unknown(format!("ser: {e}")))
}
