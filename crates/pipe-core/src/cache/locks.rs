//! Locks por `(scope, componente, key)`.
//!
//! Serializan dentro del proceso la secuencia lookup → ejecución →
//! publicación de un componente cacheable: dos invocaciones concurrentes con
//! la misma key no pueden ambas fallar la cache y publicar artifacts. Entre
//! procesos la garantía la da el store (ver `CompletionOutcome::Superseded`).
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::model::{CacheKey, PipelineScope};

#[derive(Debug, Clone, Default)]
pub struct KeyLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ejecuta `f` con el lock de la key tomado.
    pub fn with_lock<T>(&self, scope: &PipelineScope, component: &str, key: &CacheKey, f: impl FnOnce() -> T) -> T {
        let slot = slot(scope, component, key);
        let lock = self.inner.entry(slot.clone()).or_default().clone();
        let result = {
            // un panic en otro holder no invalida el lock: no protege datos
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };
        drop(lock);
        // sólo queda la referencia del mapa: nadie más espera este slot
        self.inner.remove_if(&slot, |_, held| Arc::strong_count(held) == 1);
        result
    }

    /// Slots vivos (keys con algún holder en curso).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn slot(scope: &PipelineScope, component: &str, key: &CacheKey) -> String {
    format!("{}\u{1f}{}\u{1f}{}\u{1f}{}", scope.pipeline_name, scope.root_str(), component, key)
}
