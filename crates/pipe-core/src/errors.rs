//! Taxonomía de errores del core.
//!
//! - `DefinitionError`: pipeline mal formado, detectado al construirlo.
//! - `DagError`: inconsistencia de topología en tiempo de ejecución.
//! - `StoreError`: fallo del backend de metadata.
//! - `EngineError`: error de una corrida; agrupa los anteriores más
//!   `ComponentFailure` e I/O del layout de salida.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{ArtifactId, ExecutionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("component name must not be empty")]
    EmptyName,
    #[error("duplicate component name '{0}'")]
    DuplicateComponent(String),
    #[error("component '{component}' declares channel '{channel}' twice")]
    DuplicateChannel { component: String, channel: String },
    #[error("component '{component}' input '{input}' references unknown component '{upstream}'")]
    UnknownComponent { component: String, input: String, upstream: String },
    #[error("component '{component}' input '{input}' references undeclared output '{upstream}.{output}'")]
    UnknownOutput { component: String, input: String, upstream: String, output: String },
    #[error("component '{component}' input '{input}' expects type '{expected}' but '{upstream}.{output}' produces '{found}'")]
    TypeMismatch { component: String, input: String, upstream: String, output: String, expected: String, found: String },
    #[error("dependency cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DagError {
    #[error("topological sort found a cycle among: {}", remaining.join(", "))]
    CycleDetected { remaining: Vec<String> },
    #[error("component '{component}' requires input '{input}' but upstream produced no artifact")]
    MissingInput { component: String, input: String },
    #[error("component '{component}' depends on '{upstream}' which has not run")]
    UpstreamNotRun { component: String, upstream: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Fallo de I/O o de conexión del backend. No se reintenta en el engine.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
    #[error("execution {0} not found")]
    ExecutionNotFound(ExecutionId),
    #[error("artifact {0} not found")]
    ArtifactNotFound(ArtifactId),
    #[error("execution {id} is '{state}', expected 'running'")]
    InvalidTransition { id: ExecutionId, state: String },
    #[error("corrupt metadata: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Dag(#[from] DagError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("component '{component}' failed: {message}")]
    ComponentFailure { component: String, message: String },
    #[error("i/o error at {}: {source}", path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("internal: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// `true` para errores que no dejan avanzar ningún componente más.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::ComponentFailure { .. })
    }
}
