//! Tipado fuerte opcional para artifacts manteniendo el núcleo agnóstico.
//!
//! Un tipo que implementa `ArtifactSpec` sabe convertirse en `ArtifactDraft`
//! (lo que devuelve un componente) y reconstruirse desde un `Artifact`
//! publicado, verificando tipo, versión de esquema y validación propia.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{Artifact, ArtifactDraft};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArtifactDecodeError {
    #[error("expected artifact type '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },
    #[error("expected schema version {expected}, found {found:?}")]
    VersionMismatch { expected: u32, found: Option<u32> },
    #[error("serde: {0}")]
    Serde(String),
    #[error("validation: {0}")]
    Validation(String),
}

pub trait ArtifactSpec: Sized + Serialize + DeserializeOwned {
    /// Nombre de tipo con el que se registra en el store.
    const TYPE_NAME: &'static str;
    /// Incrementar en cambios incompatibles del payload.
    const SCHEMA_VERSION: u32 = 1;

    /// Validación semántica ligera (sin efectos secundarios).
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Propiedades custom (no entran al fingerprint).
    fn properties(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    fn version_field_name() -> &'static str {
        "schema_version"
    }

    fn into_draft(self) -> Result<ArtifactDraft, ArtifactDecodeError> {
        self.validate().map_err(ArtifactDecodeError::Validation)?;
        let properties = self.properties();
        let mut payload = serde_json::to_value(&self).map_err(|e| ArtifactDecodeError::Serde(e.to_string()))?;
        if let Value::Object(map) = &mut payload {
            map.entry(Self::version_field_name().to_string())
               .or_insert(Value::from(Self::SCHEMA_VERSION));
        }
        Ok(ArtifactDraft { type_name: Self::TYPE_NAME.to_string(),
                           payload,
                           properties })
    }

    fn from_artifact(a: &Artifact) -> Result<Self, ArtifactDecodeError> {
        if a.type_name != Self::TYPE_NAME {
            return Err(ArtifactDecodeError::TypeMismatch { expected: Self::TYPE_NAME.to_string(),
                                                           found: a.type_name.clone() });
        }
        let found = a.payload
                     .get(Self::version_field_name())
                     .and_then(Value::as_u64)
                     .map(|v| v as u32);
        if found != Some(Self::SCHEMA_VERSION) {
            return Err(ArtifactDecodeError::VersionMismatch { expected: Self::SCHEMA_VERSION,
                                                              found });
        }
        let decoded: Self =
            serde_json::from_value(a.payload.clone()).map_err(|e| ArtifactDecodeError::Serde(e.to_string()))?;
        decoded.validate().map_err(ArtifactDecodeError::Validation)?;
        Ok(decoded)
    }
}

/// Declara un artifact tipado con derives e `ArtifactSpec`.
///
/// ```ignore
/// typed_artifact!(Examples { num_rows: u64 } type_name: "Examples");
/// ```
#[macro_export]
macro_rules! typed_artifact {
    ($name:ident { $($fname:ident : $fty:ty),* $(,)? } type_name: $type_name:expr) => {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name { $(pub $fname: $fty,)* pub schema_version: u32 }
        impl $crate::model::ArtifactSpec for $name {
            const TYPE_NAME: &'static str = $type_name;
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactId;
    use chrono::Utc;

    typed_artifact!(Stats { num_rows: u64 } type_name: "Stats");

    fn publish(draft: ArtifactDraft) -> Artifact {
        Artifact { id: ArtifactId(1),
                   type_name: draft.type_name,
                   uri: "/tmp/x".into(),
                   fingerprint: String::new(),
                   properties: draft.properties,
                   payload: draft.payload,
                   producer: None,
                   created_at: Utc::now() }
    }

    #[test]
    fn draft_carries_version_and_decodes_back() {
        let draft = Stats { num_rows: 3, schema_version: 1 }.into_draft().unwrap();
        assert_eq!(draft.type_name, "Stats");
        let back = Stats::from_artifact(&publish(draft)).unwrap();
        assert_eq!(back.num_rows, 3);
    }

    #[test]
    fn decode_rejects_other_type() {
        let mut draft = Stats { num_rows: 3, schema_version: 1 }.into_draft().unwrap();
        draft.type_name = "Model".into();
        let err = Stats::from_artifact(&publish(draft)).unwrap_err();
        assert!(matches!(err, ArtifactDecodeError::TypeMismatch { .. }));
    }
}
