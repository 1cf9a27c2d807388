//! Transform: ajusta normalizadores y vocabularios sobre el split train y
//! materializa los ejemplos transformados de todos los splits.
//!
//! - Numéricas: z-score; un valor faltante se imputa con la media (0.0).
//! - Categóricas: índice en el vocabulario; fuera de vocabulario usa el
//!   índice `len(vocab)`.
//! - El label se copia sin cambios.

use std::collections::{BTreeMap, BTreeSet};

use pipe_core::model::ArtifactSpec;
use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};

use super::statistics_gen::numeric_stats;
use super::{finish, load_module, load_schema, output_dir, read_split, single_input, TRAIN_SPLIT};
use crate::artifacts::{ExamplesArtifact, FeatureKind, Normalizer, SchemaArtifact, TransformGraphArtifact,
                       SPLIT_DATA_FILE};
use crate::error::AdapterError;
use crate::module_file::ModuleSpec;
use crate::table::{parse_number, Table};

#[derive(Debug, Default)]
pub struct Transform;

pub(crate) fn check_schema(module: &ModuleSpec, schema: &SchemaArtifact) -> Result<(), AdapterError> {
    for column in module.required_columns() {
        let feature = schema.features
                            .iter()
                            .find(|f| f.name == column)
                            .ok_or_else(|| AdapterError::Invalid(format!("column '{column}' is not in the schema")))?;
        if module.numeric_features.iter().any(|n| n == column) && feature.kind != FeatureKind::Float {
            return Err(AdapterError::Invalid(format!("numeric feature '{column}' is not a float in the schema")));
        }
    }
    Ok(())
}

pub(crate) fn fit(module: &ModuleSpec, train: &Table) -> Result<TransformGraphArtifact, AdapterError> {
    let mut numeric = BTreeMap::new();
    for name in &module.numeric_features {
        let values: Vec<f64> = train.numeric_column(name)?.into_iter().flatten().collect();
        if values.is_empty() {
            return Err(AdapterError::Invalid(format!("feature '{name}' has no numeric values in train")));
        }
        let s = numeric_stats(&values);
        numeric.insert(name.clone(),
                       Normalizer { mean: s.mean,
                                    std_dev: s.std_dev });
    }
    let mut vocabularies = BTreeMap::new();
    for name in &module.categorical_features {
        let vocab: BTreeSet<&str> = train.column(name)?.into_iter().filter(|v| !v.is_empty()).collect();
        vocabularies.insert(name.clone(), vocab.into_iter().map(str::to_string).collect());
    }
    Ok(TransformGraphArtifact { label_key: module.label_key.clone(),
                                numeric,
                                vocabularies,
                                schema_version: 1 })
}

pub(crate) fn apply(graph: &TransformGraphArtifact, table: &Table) -> Result<Table, AdapterError> {
    let mut columns: Vec<String> = graph.numeric.keys().cloned().collect();
    columns.extend(graph.vocabularies.keys().cloned());
    columns.push(graph.label_key.clone());

    let mut out = Table::new(columns);
    let numeric: Vec<(usize, &Normalizer)> = graph.numeric
                                                  .iter()
                                                  .map(|(name, n)| table.column_index(name).map(|i| (i, n)))
                                                  .collect::<Result<_, AdapterError>>()?;
    let categorical: Vec<(usize, &Vec<String>)> = graph.vocabularies
                                                       .iter()
                                                       .map(|(name, v)| table.column_index(name).map(|i| (i, v)))
                                                       .collect::<Result<_, AdapterError>>()?;
    let label = table.column_index(&graph.label_key)?;
    for row in &table.rows {
        let mut transformed = Vec::with_capacity(out.columns.len());
        for (idx, normalizer) in &numeric {
            let z = parse_number(&row[*idx]).map(|v| normalizer.apply(v)).unwrap_or(0.0);
            transformed.push(format!("{z:.6}"));
        }
        for (idx, vocab) in &categorical {
            let pos = vocab.iter().position(|v| v == &row[*idx]).unwrap_or(vocab.len());
            transformed.push(pos.to_string());
        }
        transformed.push(row[label].clone());
        out.rows.push(transformed);
    }
    Ok(out)
}

impl Transform {
    fn generate(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let module = load_module(ctx)?;
        let schema = load_schema(single_input(ctx, "schema")?)?;
        check_schema(&module, &schema)?;

        let raw = single_input(ctx, "examples")?;
        let examples = ExamplesArtifact::from_artifact(raw)?;
        let graph = fit(&module, &read_split(raw, TRAIN_SPLIT)?)?;

        let dir = output_dir(ctx, "transformed_examples")?;
        let mut columns = Vec::new();
        for split in examples.splits.keys() {
            let table = apply(&graph, &read_split(raw, split)?)?;
            table.write(&dir.join(split).join(SPLIT_DATA_FILE))?;
            columns = table.columns;
        }
        let transformed = ExamplesArtifact { num_rows: examples.num_rows,
                                             columns,
                                             splits: examples.splits.clone(),
                                             schema_version: 1 };
        Ok(ComponentOutputs::new().typed("transform_graph", graph)?
                                  .typed("transformed_examples", transformed)?)
    }
}

impl Component for Transform {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::generate(ctx))
    }
}
