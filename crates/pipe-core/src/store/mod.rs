//! Artifact Store: registro durable de artifacts, ejecuciones y sus vínculos.
//!
//! Contrato común a todos los backends:
//! - Cada operación es atómica: o se ve completa o no se ve.
//! - Los ids se asignan en orden creciente y nunca se reutilizan.
//! - Nada se borra; las ejecuciones sólo avanzan de `running` a un estado
//!   terminal.
//! - Fallos del backend se reportan como `StoreError::Unavailable`; el
//!   engine no reintenta.

mod memory;

pub use memory::InMemoryMetadataStore;

use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::model::{Artifact, ArtifactEvent, ArtifactId, CacheKey, CachingPolicy, Execution, ExecutionId, PipelineScope};

/// Datos para registrar el inicio de una ejecución.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub run_id: Uuid,
    pub component: String,
    pub scope: PipelineScope,
    pub cache_key: CacheKey,
    pub caching: CachingPolicy,
    pub inputs: Vec<ArtifactEvent>,
}

/// Artifact nuevo ya listo para persistir (uri y fingerprint resueltos).
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtifact {
    pub type_name: String,
    pub uri: String,
    pub fingerprint: String,
    pub properties: BTreeMap<String, Value>,
    pub payload: Value,
}

/// Output publicado en un canal.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishedOutput {
    Fresh { channel: String, artifact: NewArtifact },
    Existing { channel: String, artifact_id: ArtifactId },
}

impl PublishedOutput {
    pub fn channel(&self) -> &str {
        match self {
            PublishedOutput::Fresh { channel, .. } | PublishedOutput::Existing { channel, .. } => channel,
        }
    }
}

/// Resultado de `complete_execution`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// Outputs publicados; la ejecución quedó `complete`.
    Published { outputs: Vec<ArtifactEvent> },
    /// Otra ejecución con la misma key ganó la carrera: esta quedó `cached`
    /// contra `winner` y no se escribió ningún artifact nuevo.
    Superseded { winner: ExecutionId, outputs: Vec<ArtifactEvent> },
}

impl CompletionOutcome {
    pub fn outputs(&self) -> &[ArtifactEvent] {
        match self {
            CompletionOutcome::Published { outputs } | CompletionOutcome::Superseded { outputs, .. } => outputs,
        }
    }
}

pub trait MetadataStore: Send + Sync {
    /// Inserta una ejecución en estado `running` con sus inputs vinculados.
    fn record_execution_start(&self, execution: NewExecution) -> Result<ExecutionId, StoreError>;

    /// Ejecución `complete` o `cached` más reciente con la misma key dentro
    /// del scope.
    fn find_cached_execution(&self,
                             component: &str,
                             cache_key: &CacheKey,
                             scope: &PipelineScope)
                             -> Result<Option<Execution>, StoreError>;

    /// Escribe outputs (ids nuevos para los frescos), los vincula y marca la
    /// ejecución `complete`, salvo que otra ejecución cacheable con la misma
    /// key se haya completado antes (ver `CompletionOutcome::Superseded`).
    fn complete_execution(&self,
                          id: ExecutionId,
                          outputs: Vec<PublishedOutput>)
                          -> Result<CompletionOutcome, StoreError>;

    /// Marca `cached` vinculando outputs existentes; no crea artifacts.
    fn mark_cached(&self,
                   id: ExecutionId,
                   cached_from: ExecutionId,
                   outputs: &[ArtifactEvent])
                   -> Result<(), StoreError>;

    /// Estado terminal `failed`, sin outputs.
    fn fail_execution(&self, id: ExecutionId, error: &str) -> Result<(), StoreError>;

    /// Importa datos externos. Idempotente: devuelve el artifact existente si
    /// ya hay uno con el mismo tipo, uri y fingerprint.
    fn register_external_artifact(&self, type_name: &str, uri: &str, fingerprint: &str)
                                  -> Result<Artifact, StoreError>;

    fn get_execution(&self, id: ExecutionId) -> Result<Execution, StoreError>;
    fn get_artifacts(&self) -> Result<Vec<Artifact>, StoreError>;
    fn get_executions(&self) -> Result<Vec<Execution>, StoreError>;
    /// Artifacts en el orden de `ids`; error si alguno no existe.
    fn get_artifacts_by_id(&self, ids: &[ArtifactId]) -> Result<Vec<Artifact>, StoreError>;
    fn get_artifacts_by_type(&self, type_name: &str) -> Result<Vec<Artifact>, StoreError>;
}

/// Agrupa eventos de output por canal preservando la posición.
pub fn outputs_by_channel(events: &[ArtifactEvent]) -> BTreeMap<String, Vec<ArtifactId>> {
    let mut sorted: Vec<&ArtifactEvent> = events.iter().collect();
    sorted.sort_by(|a, b| a.channel.cmp(&b.channel).then(a.position.cmp(&b.position)));
    let mut out: BTreeMap<String, Vec<ArtifactId>> = BTreeMap::new();
    for e in sorted {
        out.entry(e.channel.clone()).or_default().push(e.artifact_id);
    }
    out
}
