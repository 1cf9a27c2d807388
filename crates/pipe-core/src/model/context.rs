use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use uuid::Uuid;

use super::{Artifact, ArtifactId, ExecutionId, PipelineScope};
use crate::errors::StoreError;
use crate::store::MetadataStore;

/// Vista de sólo lectura del store entregada a los componentes. Un
/// componente puede consultar artifacts (resolvers) pero nunca escribir.
#[derive(Clone, Copy)]
pub struct MetadataReader<'a> {
    store: &'a dyn MetadataStore,
}

impl<'a> MetadataReader<'a> {
    pub fn new(store: &'a dyn MetadataStore) -> Self {
        Self { store }
    }

    pub fn artifacts_of_type(&self, type_name: &str) -> Result<Vec<Artifact>, StoreError> {
        self.store.get_artifacts_by_type(type_name)
    }

    pub fn artifacts_by_id(&self, ids: &[ArtifactId]) -> Result<Vec<Artifact>, StoreError> {
        self.store.get_artifacts_by_id(ids)
    }
}

/// Contexto de ejecución entregado a `Component::run`.
pub struct ExecutionContext<'a> {
    pub component: &'a str,
    pub execution_id: ExecutionId,
    pub run_id: Uuid,
    pub scope: &'a PipelineScope,
    /// Inputs resueltos por canal, en el orden publicado por el upstream.
    pub inputs: &'a BTreeMap<String, Vec<Artifact>>,
    pub config: &'a Value,
    /// Directorio preparado por el executor para cada canal de salida.
    pub output_dirs: &'a BTreeMap<String, PathBuf>,
    pub metadata: MetadataReader<'a>,
}

impl<'a> ExecutionContext<'a> {
    pub fn input(&self, channel: &str) -> &[Artifact] {
        self.inputs.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Primer artifact del canal; error legible si el canal está vacío.
    pub fn single_input(&self, channel: &str) -> Result<&Artifact, String> {
        self.input(channel)
            .first()
            .ok_or_else(|| format!("{}: missing input '{channel}'", self.component))
    }

    pub fn output_dir(&self, channel: &str) -> Option<&Path> {
        self.output_dirs.get(channel).map(PathBuf::as_path)
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}
