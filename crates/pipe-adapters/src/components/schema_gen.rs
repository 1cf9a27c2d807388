//! SchemaGen: infiere un schema a partir de las estadísticas.
//!
//! Columna numérica en todos sus valores presentes -> `float`, si no
//! `string`. Requerida si no tiene faltantes.

use pipe_core::model::ArtifactSpec;
use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};

use super::{finish, single_input};
use crate::artifacts::{FeatureKind, FeatureSpec, SchemaArtifact, StatisticsArtifact};
use crate::error::AdapterError;

#[derive(Debug, Default)]
pub struct SchemaGen;

pub(crate) fn infer_schema(stats: &StatisticsArtifact) -> SchemaArtifact {
    let features = stats.features
                        .iter()
                        .map(|(name, f)| FeatureSpec { name: name.clone(),
                                                       kind: if f.numeric.is_some() {
                                                           FeatureKind::Float
                                                       } else {
                                                           FeatureKind::String
                                                       },
                                                       required: f.missing == 0 })
                        .collect();
    SchemaArtifact { features,
                     schema_version: 1 }
}

impl SchemaGen {
    fn generate(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let stats = StatisticsArtifact::from_artifact(single_input(ctx, "statistics")?)?;
        Ok(ComponentOutputs::new().typed("schema", infer_schema(&stats))?)
    }
}

impl Component for SchemaGen {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::generate(ctx))
    }
}
