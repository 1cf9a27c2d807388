//! Execution: una invocación registrada de un componente dentro de una corrida.
//!
//! Rol en el flujo:
//! - El executor la crea en estado `Running` al comenzar la invocación.
//! - Termina en `Complete` (trabajo real), `Cached` (reutilizó outputs de
//!   otra ejecución) o `Failed` (el body del componente devolvió error).
//! - Nunca se borra: el store es el registro de auditoría de todas las
//!   corridas.
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ArtifactId, CacheKey, CachingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub i64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Estado persistido de una ejecución.
///
/// Transiciones válidas: `Running -> Complete | Cached | Failed`. Ningún
/// estado terminal vuelve a `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Running,
    Complete,
    Cached,
    Failed,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Running => "running",
            ExecutionState::Complete => "complete",
            ExecutionState::Cached => "cached",
            ExecutionState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(ExecutionState::Running),
            "complete" => Some(ExecutionState::Complete),
            "cached" => Some(ExecutionState::Cached),
            "failed" => Some(ExecutionState::Failed),
            _ => None,
        }
    }

    /// Estados cuyos outputs son reutilizables como cache hit.
    pub fn is_reusable(&self) -> bool {
        matches!(self, ExecutionState::Complete | ExecutionState::Cached)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ámbito de cache: sólo ejecuciones del mismo pipeline (nombre + root) son
/// candidatas a cache hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineScope {
    pub pipeline_name: String,
    pub pipeline_root: PathBuf,
}

impl PipelineScope {
    pub fn new(pipeline_name: impl Into<String>, pipeline_root: impl Into<PathBuf>) -> Self {
        Self { pipeline_name: pipeline_name.into(),
               pipeline_root: pipeline_root.into() }
    }

    pub fn root_str(&self) -> String {
        self.pipeline_root.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Input,
    Output,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Input => "input",
            EventKind::Output => "output",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(EventKind::Input),
            "output" => Some(EventKind::Output),
            _ => None,
        }
    }
}

/// Vínculo ejecución→artifact dentro de un canal (ordenado por `position`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEvent {
    pub kind: EventKind,
    pub channel: String,
    pub position: usize,
    pub artifact_id: ArtifactId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub run_id: Uuid,
    pub component: String,
    pub scope: PipelineScope,
    pub state: ExecutionState,
    pub cache_key: CacheKey,
    pub caching: CachingPolicy,
    pub inputs: Vec<ArtifactEvent>,
    pub outputs: Vec<ArtifactEvent>,
    /// Ejecución cuyos outputs se reutilizaron (sólo en `Cached`).
    pub cached_from: Option<ExecutionId>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn input_ids(&self) -> Vec<ArtifactId> {
        self.inputs.iter().map(|e| e.artifact_id).collect()
    }

    pub fn output_ids(&self) -> Vec<ArtifactId> {
        self.outputs.iter().map(|e| e.artifact_id).collect()
    }
}
