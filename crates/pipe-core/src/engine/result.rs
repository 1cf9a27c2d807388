use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Artifact, ExecutionId, ExecutionState};

/// Resultado de un componente dentro de una corrida.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentOutcome {
    pub component: String,
    pub state: ExecutionState,
    pub execution_id: ExecutionId,
    /// Artifacts por canal declarado (vacío si no se publicó nada).
    pub outputs: BTreeMap<String, Vec<Artifact>>,
}

impl ComponentOutcome {
    pub fn output(&self, channel: &str) -> &[Artifact] {
        self.outputs.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRunResult {
    pub run_id: Uuid,
    pub pipeline_name: String,
    /// Ver `PipelineDefinition::definition_hash`.
    pub definition_hash: String,
    pub started_at: DateTime<Utc>,
    /// En orden topológico.
    pub outcomes: Vec<ComponentOutcome>,
}

impl PipelineRunResult {
    pub fn outcome(&self, component: &str) -> Option<&ComponentOutcome> {
        self.outcomes.iter().find(|o| o.component == component)
    }

    pub fn count_in_state(&self, state: ExecutionState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}
