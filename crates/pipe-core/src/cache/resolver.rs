//! Cálculo determinista de cache keys.
//!
//! La key es el hash blake3 del JSON canónico de:
//! - versión del engine y versión declarada del componente,
//! - nombre del componente,
//! - inputs resueltos por canal (en orden),
//! - configuración del componente.
//!
//! El JSON canónico ordena claves de objetos, así que el orden de iteración
//! de mapas no afecta el resultado; el orden dentro de un canal sí cuenta.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::component::ComponentSpec;
use crate::constants::ENGINE_VERSION;
use crate::hashing::hash_value;
use crate::model::{Artifact, CacheKey};

/// Qué identifica a un artifact de input dentro de la key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputIdentity {
    /// Id del store + fingerprint: dos artifacts distintos nunca son
    /// intercambiables aunque tengan el mismo contenido.
    #[default]
    ArtifactId,
    /// Tipo + fingerprint: artifacts con igual contenido son intercambiables.
    ContentFingerprint,
}

impl InputIdentity {
    fn as_str(&self) -> &'static str {
        match self {
            InputIdentity::ArtifactId => "artifact_id",
            InputIdentity::ContentFingerprint => "content_fingerprint",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyResolver {
    pub identity: InputIdentity,
}

impl CacheKeyResolver {
    pub fn new(identity: InputIdentity) -> Self {
        Self { identity }
    }

    pub fn compute_key(&self,
                       component: &str,
                       version: &str,
                       inputs: &BTreeMap<String, Vec<Artifact>>,
                       config: &Value)
                       -> CacheKey {
        let inputs_json: serde_json::Map<String, Value> =
            inputs.iter()
                  .map(|(channel, artifacts)| {
                      let items: Vec<Value> = artifacts.iter().map(|a| self.identify(a)).collect();
                      (channel.clone(), Value::Array(items))
                  })
                  .collect();
        let fp = json!({
            "engine_version": ENGINE_VERSION,
            "component": component,
            "version": version,
            "identity": self.identity.as_str(),
            "inputs": inputs_json,
            "config": config,
        });
        CacheKey(hash_value(&fp))
    }

    pub fn key_for(&self, spec: &ComponentSpec, inputs: &BTreeMap<String, Vec<Artifact>>) -> CacheKey {
        self.compute_key(&spec.name, &spec.version, inputs, &spec.config)
    }

    fn identify(&self, a: &Artifact) -> Value {
        match self.identity {
            InputIdentity::ArtifactId => json!({ "id": a.id.0, "type": a.type_name, "fingerprint": a.fingerprint }),
            InputIdentity::ContentFingerprint => json!({ "type": a.type_name, "fingerprint": a.fingerprint }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactId;
    use chrono::Utc;

    fn art(id: i64, fp: &str) -> Artifact {
        Artifact { id: ArtifactId(id),
                   type_name: "Examples".into(),
                   uri: format!("/root/gen/examples/{id}"),
                   fingerprint: fp.into(),
                   properties: Default::default(),
                   payload: json!({}),
                   producer: None,
                   created_at: Utc::now() }
    }

    #[test]
    fn channel_insertion_order_does_not_matter() {
        let r = CacheKeyResolver::default();
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), vec![art(1, "f1")]);
        a.insert("y".to_string(), vec![art(2, "f2")]);
        let mut b = BTreeMap::new();
        b.insert("y".to_string(), vec![art(2, "f2")]);
        b.insert("x".to_string(), vec![art(1, "f1")]);
        let cfg_a = json!({"steps": 10, "module": "m.py"});
        let cfg_b = json!({"module": "m.py", "steps": 10});
        assert_eq!(r.compute_key("c", "1", &a, &cfg_a), r.compute_key("c", "1", &b, &cfg_b));
    }

    #[test]
    fn version_and_name_are_part_of_the_key() {
        let r = CacheKeyResolver::default();
        let inputs = BTreeMap::new();
        let cfg = json!({});
        let base = r.compute_key("c", "1", &inputs, &cfg);
        assert_ne!(base, r.compute_key("c", "2", &inputs, &cfg));
        assert_ne!(base, r.compute_key("d", "1", &inputs, &cfg));
    }
}
