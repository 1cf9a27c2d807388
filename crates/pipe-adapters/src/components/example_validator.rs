//! ExampleValidator: compara estadísticas contra un schema.
//!
//! Las anomalías se publican como artifact; no hacen fallar al componente.

use log::warn;
use pipe_core::model::ArtifactSpec;
use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};

use super::{finish, load_schema, single_input};
use crate::artifacts::{AnomaliesArtifact, Anomaly, FeatureKind, SchemaArtifact, StatisticsArtifact};
use crate::error::AdapterError;

#[derive(Debug, Default)]
pub struct ExampleValidator;

pub(crate) fn validate(stats: &StatisticsArtifact, schema: &SchemaArtifact) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    for feature in &schema.features {
        let Some(fs) = stats.features.get(&feature.name) else {
            anomalies.push(Anomaly { feature: feature.name.clone(),
                                     description: "column missing from data".into() });
            continue;
        };
        if feature.required && fs.missing > 0 {
            anomalies.push(Anomaly { feature: feature.name.clone(),
                                     description: format!("required feature has {} missing values", fs.missing) });
        }
        if feature.kind == FeatureKind::Float && fs.count > 0 && fs.numeric.is_none() {
            anomalies.push(Anomaly { feature: feature.name.clone(),
                                     description: "expected float values".into() });
        }
    }
    for name in stats.features.keys() {
        if !schema.features.iter().any(|f| &f.name == name) {
            anomalies.push(Anomaly { feature: name.clone(),
                                     description: "column not in schema".into() });
        }
    }
    anomalies
}

impl ExampleValidator {
    fn generate(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let stats = StatisticsArtifact::from_artifact(single_input(ctx, "statistics")?)?;
        let schema = load_schema(single_input(ctx, "schema")?)?;
        let anomalies = validate(&stats, &schema);
        if !anomalies.is_empty() {
            warn!("ExampleValidator: {} anomalies, first: {} ({})",
                  anomalies.len(),
                  anomalies[0].feature,
                  anomalies[0].description);
        }
        Ok(ComponentOutputs::new().typed("anomalies",
                                         AnomaliesArtifact { anomalies,
                                                             schema_version: 1 })?)
    }
}

impl Component for ExampleValidator {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::generate(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{FeatureSpec, FeatureStats};
    use std::collections::BTreeMap;

    fn stats(entries: &[(&str, u64, bool)]) -> StatisticsArtifact {
        let features = entries.iter()
                              .map(|(name, missing, numeric)| {
                                  (name.to_string(),
                                   FeatureStats { count: 3,
                                                  missing: *missing,
                                                  unique: 3,
                                                  numeric: numeric.then(|| {
                                                                      crate::artifacts::NumericStats { min: 0.0,
                                                                                                       max: 1.0,
                                                                                                       mean: 0.5,
                                                                                                       std_dev: 0.5 }
                                                                  }) })
                              })
                              .collect::<BTreeMap<_, _>>();
        StatisticsArtifact { num_examples: 3,
                             features,
                             schema_version: 1 }
    }

    #[test]
    fn matching_data_has_no_anomalies() {
        let schema = SchemaArtifact { features: vec![FeatureSpec { name: "fare".into(),
                                                                   kind: FeatureKind::Float,
                                                                   required: true }],
                                      schema_version: 1 };
        assert!(validate(&stats(&[("fare", 0, true)]), &schema).is_empty());
    }

    #[test]
    fn reports_missing_extra_and_mistyped_columns() {
        let schema = SchemaArtifact { features: vec![FeatureSpec { name: "fare".into(),
                                                                   kind: FeatureKind::Float,
                                                                   required: true },
                                                     FeatureSpec { name: "tips".into(),
                                                                   kind: FeatureKind::Float,
                                                                   required: false }],
                                      schema_version: 1 };
        let found = validate(&stats(&[("fare", 1, false), ("company", 0, false)]), &schema);
        let features: Vec<&str> = found.iter().map(|a| a.feature.as_str()).collect();
        assert_eq!(features, vec!["fare", "fare", "tips", "company"]);
    }
}
