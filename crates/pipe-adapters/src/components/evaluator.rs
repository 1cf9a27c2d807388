//! Evaluator: precisión del modelo sobre el split eval y bendición.
//!
//! Bendecido si `accuracy >= accuracy_threshold` y, si hay modelo base,
//! `accuracy >= baseline_accuracy` (el empate bendice). La bendición lleva
//! las propiedades `blessed` (0/1), `current_model_id` y, si aplica,
//! `baseline_model_id`.

use log::info;
use pipe_core::model::ArtifactSpec;
use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};
use serde_json::Value;

use super::trainer::accuracy;
use super::{finish, read_split, single_input, EVAL_SPLIT};
use crate::artifacts::{BlessingArtifact, EvaluationArtifact, ModelArtifact};
use crate::error::AdapterError;

pub const DEFAULT_ACCURACY_THRESHOLD: f64 = 0.6;

#[derive(Debug, Default)]
pub struct Evaluator;

pub(crate) fn is_blessed(accuracy: f64, threshold: f64, baseline: Option<f64>) -> bool {
    accuracy >= threshold && baseline.map_or(true, |b| accuracy >= b)
}

impl Evaluator {
    fn evaluate(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let eval = read_split(single_input(ctx, "examples")?, EVAL_SPLIT)?;
        let candidate = single_input(ctx, "model")?;
        let model = ModelArtifact::from_artifact(candidate)?;
        let current = accuracy(&model, &eval, true)?;

        let baseline = ctx.input("baseline_model").first();
        let baseline_accuracy = match baseline {
            Some(a) => Some(accuracy(&ModelArtifact::from_artifact(a)?, &eval, true)?),
            None => None,
        };
        let threshold = ctx.config_value("accuracy_threshold")
                           .and_then(Value::as_f64)
                           .unwrap_or(DEFAULT_ACCURACY_THRESHOLD);
        let blessed = is_blessed(current, threshold, baseline_accuracy);
        info!("Evaluator: model {} accuracy {current:.3} (baseline {:?}, threshold {threshold}) blessed={blessed}",
              candidate.id,
              baseline_accuracy);

        let mut blessing = BlessingArtifact { blessed,
                                              schema_version: 1 }.into_draft()?
                                                                 .with_property("blessed", i64::from(blessed))
                                                                 .with_property("current_model_id", candidate.id.0);
        if let Some(b) = baseline {
            blessing = blessing.with_property("baseline_model_id", b.id.0);
        }
        let evaluation = EvaluationArtifact { accuracy: current,
                                              baseline_accuracy,
                                              eval_examples: eval.len() as u64,
                                              schema_version: 1 };
        Ok(ComponentOutputs::new().typed("evaluation", evaluation)?
                                  .fresh("blessing", blessing))
    }
}

impl Component for Evaluator {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::evaluate(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blessing_requires_threshold_and_no_regression() {
        assert!(is_blessed(0.8, 0.6, None));
        assert!(!is_blessed(0.5, 0.6, None));
        assert!(is_blessed(0.8, 0.6, Some(0.8)));
        assert!(!is_blessed(0.7, 0.6, Some(0.8)));
    }
}
