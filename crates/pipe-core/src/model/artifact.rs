//! Artifact: unidad tipada e inmutable de datos producida o consumida por
//! componentes.
//!
//! - `id` lo asigna el store; datos nuevos implican siempre un id nuevo.
//! - `fingerprint` es el hash de contenido (payload canónico para artifacts
//!   producidos, árbol de archivos para datos externos). Es lo que permite a
//!   la cache reconocer "el mismo dato".
//! - `properties` son metadatos libres; no entran al fingerprint.
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ExecutionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub i64);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub type_name: String,
    pub uri: String,
    pub fingerprint: String,
    pub properties: BTreeMap<String, Value>,
    pub payload: Value,
    /// `None` para datos externos importados.
    pub producer: Option<ExecutionId>,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn int_property(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(Value::as_i64)
    }
}

/// Artifact aún no publicado: lo devuelve un componente y el executor le
/// asigna uri y fingerprint antes de entregarlo al store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDraft {
    pub type_name: String,
    pub payload: Value,
    pub properties: BTreeMap<String, Value>,
}

impl ArtifactDraft {
    pub fn new(type_name: impl Into<String>, payload: Value) -> Self {
        Self { type_name: type_name.into(),
               payload,
               properties: BTreeMap::new() }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Salida de un componente para un canal: un artifact nuevo o la referencia
/// a uno que ya existe en el store (resolvers, importers).
#[derive(Debug, Clone, PartialEq)]
pub enum OutputArtifact {
    Fresh(ArtifactDraft),
    Existing(ArtifactId),
}
