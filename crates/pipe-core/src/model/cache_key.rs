use std::fmt;

use serde::{Deserialize, Serialize};

/// Digest hex que identifica "mismo componente, mismos inputs, misma
/// configuración". Dos ejecuciones con la misma key son equivalentes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(pub String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Política de cache declarada por cada componente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachingPolicy {
    /// Puede reutilizar una ejecución previa con la misma key.
    #[default]
    Cacheable,
    /// Se ejecuta siempre (resolvers): nunca termina en `cached`.
    AlwaysFresh,
}

impl CachingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachingPolicy::Cacheable => "cacheable",
            CachingPolicy::AlwaysFresh => "always_fresh",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cacheable" => Some(CachingPolicy::Cacheable),
            "always_fresh" => Some(CachingPolicy::AlwaysFresh),
            _ => None,
        }
    }
}
