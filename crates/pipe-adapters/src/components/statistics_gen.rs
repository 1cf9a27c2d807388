//! StatisticsGen: estadísticas por columna sobre todos los splits.

use std::collections::{BTreeMap, BTreeSet};

use pipe_core::model::ArtifactSpec;
use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};

use super::{finish, read_split, single_input};
use crate::artifacts::{ExamplesArtifact, FeatureStats, NumericStats, StatisticsArtifact};
use crate::error::AdapterError;
use crate::table::{parse_number, Table};

#[derive(Debug, Default)]
pub struct StatisticsGen;

impl StatisticsGen {
    fn generate(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let artifact = single_input(ctx, "examples")?;
        let examples = ExamplesArtifact::from_artifact(artifact)?;
        let mut tables = Vec::with_capacity(examples.splits.len());
        for split in examples.splits.keys() {
            tables.push(read_split(artifact, split)?);
        }
        let stats = compute_statistics(&examples.columns, &tables)?;
        Ok(ComponentOutputs::new().typed("statistics", stats)?)
    }
}

impl Component for StatisticsGen {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::generate(ctx))
    }
}

pub(crate) fn compute_statistics(columns: &[String], tables: &[Table]) -> Result<StatisticsArtifact, AdapterError> {
    let mut features = BTreeMap::new();
    let num_examples: usize = tables.iter().map(Table::len).sum();
    for column in columns {
        let mut values: Vec<&str> = Vec::with_capacity(num_examples);
        for table in tables {
            values.extend(table.column(column)?);
        }
        features.insert(column.clone(), feature_stats(&values));
    }
    Ok(StatisticsArtifact { num_examples: num_examples as u64,
                            features,
                            schema_version: 1 })
}

fn feature_stats(values: &[&str]) -> FeatureStats {
    let present: Vec<&str> = values.iter().copied().filter(|v| !v.is_empty()).collect();
    let unique = present.iter().collect::<BTreeSet<_>>().len() as u64;
    let numbers: Vec<f64> = present.iter().filter_map(|v| parse_number(v)).collect();
    let numeric = (!numbers.is_empty() && numbers.len() == present.len()).then(|| numeric_stats(&numbers));
    FeatureStats { count: present.len() as u64,
                   missing: (values.len() - present.len()) as u64,
                   unique,
                   numeric }
}

pub(crate) fn numeric_stats(numbers: &[f64]) -> NumericStats {
    let n = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / n;
    let var = numbers.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    NumericStats { min: numbers.iter().copied().fold(f64::INFINITY, f64::min),
                   max: numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                   mean,
                   std_dev: var.sqrt() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn mixed_columns_are_not_numeric_and_blanks_count_as_missing() {
        let t = Table::parse("fare,company\n2,a\n4,\nx,b\n", Path::new("t.csv")).unwrap();
        let stats = compute_statistics(&t.columns, &[t.clone()]).unwrap();
        assert_eq!(stats.num_examples, 3);
        let fare = &stats.features["fare"];
        assert!(fare.numeric.is_none());
        let company = &stats.features["company"];
        assert_eq!((company.count, company.missing, company.unique), (2, 1, 2));
    }

    #[test]
    fn numeric_stats_use_population_std_dev() {
        let s = numeric_stats(&[1.0, 3.0]);
        assert_eq!((s.min, s.max, s.mean, s.std_dev), (1.0, 3.0, 2.0, 1.0));
    }
}
