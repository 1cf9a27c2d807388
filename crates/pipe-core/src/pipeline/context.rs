//! Contexto explícito de una corrida del pipeline.
//!
//! Reemplaza cualquier estado global: el runner lo crea una vez por corrida
//! y lo pasa al executor, que a su vez lo usa en cada llamada al store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::PipelineScope;

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub scope: PipelineScope,
    pub enable_cache: bool,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(scope: PipelineScope, enable_cache: bool) -> Self {
        Self { run_id: Uuid::new_v4(),
               scope,
               enable_cache,
               started_at: Utc::now() }
    }
}
