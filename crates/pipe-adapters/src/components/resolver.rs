//! LatestBlessedModelResolver: el modelo de la bendición más reciente.
//!
//! Se declara always-fresh: el resultado depende del estado del store, no
//! de sus inputs (no tiene). Sólo considera bendiciones bajo el
//! `pipeline_root` de la corrida. Sin bendiciones publica el canal vacío.

use std::path::Path;

use log::info;
use pipe_core::{ArtifactId, Component, ComponentOutputs, ComponentRunResult, ExecutionContext};

use super::finish;
use crate::artifacts::MODEL_BLESSING;
use crate::error::AdapterError;

#[derive(Debug, Default)]
pub struct LatestBlessedModelResolver;

impl LatestBlessedModelResolver {
    fn resolve(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let blessings = ctx.metadata.artifacts_of_type(MODEL_BLESSING)?;
        let latest = blessings.iter()
                              .filter(|a| Path::new(&a.uri).starts_with(&ctx.scope.pipeline_root))
                              .filter(|a| a.int_property("blessed") == Some(1))
                              .max_by_key(|a| a.id);
        match latest.and_then(|a| a.int_property("current_model_id").map(|m| (a.id, m))) {
            Some((blessing, model)) => {
                info!("resolver: blessing {blessing} -> model {model}");
                Ok(ComponentOutputs::new().existing("model", ArtifactId(model)))
            }
            None => {
                info!("resolver: no blessed model under {}", ctx.scope.pipeline_root.display());
                Ok(ComponentOutputs::new().empty("model"))
            }
        }
    }
}

impl Component for LatestBlessedModelResolver {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::resolve(ctx))
    }
}
