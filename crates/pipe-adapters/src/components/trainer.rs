//! Trainer: clasificador por centroides sobre las features numéricas ya
//! normalizadas por Transform.
//!
//! El modelo exportable se escribe en `<uri>/serving_model/model.json`.

use std::collections::BTreeMap;

use log::info;
use pipe_core::model::ArtifactSpec;
use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};

use super::{finish, load_module, load_schema, output_dir, read_split, single_input, TRAIN_SPLIT};
use crate::artifacts::{ModelArtifact, TransformGraphArtifact, MODEL_FILE, SERVING_MODEL_DIR};
use crate::error::AdapterError;
use crate::table::{parse_number, Table};

#[derive(Debug, Default)]
pub struct Trainer;

/// Etiqueta del centroide más cercano (distancia euclídea al cuadrado). En
/// empate gana la primera etiqueta en orden lexicográfico.
pub(crate) fn predict<'m>(model: &'m ModelArtifact, features: &BTreeMap<&str, f64>) -> Option<&'m str> {
    let mut best: Option<(&str, f64)> = None;
    for (label, centroid) in &model.centroids {
        let dist: f64 = centroid.iter()
                                .map(|(f, c)| (features.get(f.as_str()).copied().unwrap_or(0.0) - c).powi(2))
                                .sum();
        match best {
            Some((_, d)) if d <= dist => {}
            _ => best = Some((label.as_str(), dist)),
        }
    }
    best.map(|(label, _)| label)
}

/// Fracción de filas de `table` clasificadas correctamente. Con
/// `normalize = true` las features se normalizan con los normalizadores del
/// modelo (tabla cruda); si no, se leen tal cual (tabla transformada).
pub(crate) fn accuracy(model: &ModelArtifact, table: &Table, normalize: bool) -> Result<f64, AdapterError> {
    if table.is_empty() {
        return Err(AdapterError::Invalid("cannot score an empty split".into()));
    }
    let label = table.column_index(&model.label_key)?;
    let columns: Vec<(&str, usize)> = model.normalizers
                                           .keys()
                                           .map(|name| table.column_index(name).map(|i| (name.as_str(), i)))
                                           .collect::<Result<_, AdapterError>>()?;
    let mut correct = 0usize;
    for row in &table.rows {
        let features: BTreeMap<&str, f64> =
            columns.iter()
                   .map(|(name, idx)| {
                       let raw = parse_number(&row[*idx]);
                       let value = match (normalize, raw) {
                           (true, Some(v)) => model.normalizers[*name].apply(v),
                           (false, Some(v)) => v,
                           (_, None) => 0.0,
                       };
                       (*name, value)
                   })
                   .collect();
        if predict(model, &features) == Some(row[label].as_str()) {
            correct += 1;
        }
    }
    Ok(correct as f64 / table.len() as f64)
}

pub(crate) fn fit(graph: &TransformGraphArtifact,
                  train: &Table,
                  train_steps: u64,
                  module_fingerprint: &str)
                  -> Result<ModelArtifact, AdapterError> {
    let labels = train.column(&graph.label_key)?;
    let mut sums: BTreeMap<String, (BTreeMap<String, f64>, usize)> = BTreeMap::new();
    for name in graph.numeric.keys() {
        let values = train.numeric_column(name)?;
        for (value, label) in values.iter().zip(&labels) {
            let entry = sums.entry(label.to_string()).or_default();
            *entry.0.entry(name.clone()).or_insert(0.0) += value.unwrap_or(0.0);
        }
    }
    for label in &labels {
        if let Some(entry) = sums.get_mut(*label) {
            entry.1 += 1;
        }
    }
    if sums.len() < 2 {
        return Err(AdapterError::Invalid(format!("label '{}' needs at least two classes in train", graph.label_key)));
    }
    let centroids = sums.into_iter()
                        .map(|(label, (totals, n))| {
                            let centroid: BTreeMap<String, f64> = totals.into_iter().map(|(f, t)| (f, t / n as f64)).collect();
                            (label, centroid)
                        })
                        .collect();
    let mut model = ModelArtifact { label_key: graph.label_key.clone(),
                                    normalizers: graph.numeric.clone(),
                                    centroids,
                                    train_accuracy: 0.0,
                                    train_steps,
                                    module_fingerprint: module_fingerprint.to_string(),
                                    schema_version: 1 };
    model.train_accuracy = accuracy(&model, train, false)?;
    Ok(model)
}

impl Trainer {
    fn generate(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let module = load_module(ctx)?;
        // el schema sólo se valida; la forma de las columnas la fija Transform
        load_schema(single_input(ctx, "schema")?)?;
        let graph = TransformGraphArtifact::from_artifact(single_input(ctx, "transform_graph")?)?;
        let train = read_split(single_input(ctx, "examples")?, TRAIN_SPLIT)?;
        let fingerprint = ctx.config_str("module_fingerprint").unwrap_or_default();
        let model = fit(&graph, &train, module.train_steps, fingerprint)?;
        info!("Trainer: {} classes, train accuracy {:.3}", model.centroids.len(), model.train_accuracy);

        let serving = output_dir(ctx, "model")?.join(SERVING_MODEL_DIR);
        std::fs::create_dir_all(&serving).map_err(|e| AdapterError::io(&serving, e))?;
        let exported = serde_json::to_string_pretty(&model).map_err(|e| AdapterError::Invalid(e.to_string()))?;
        let path = serving.join(MODEL_FILE);
        std::fs::write(&path, exported).map_err(|e| AdapterError::io(&path, e))?;

        Ok(ComponentOutputs::new().typed("model", model)?)
    }
}

impl Component for Trainer {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::generate(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::Normalizer;
    use std::path::Path;

    fn graph() -> TransformGraphArtifact {
        TransformGraphArtifact { label_key: "y".into(),
                                 numeric: [("x".to_string(), Normalizer { mean: 5.0, std_dev: 5.0 })].into_iter()
                                                                                                     .collect(),
                                 vocabularies: BTreeMap::new(),
                                 schema_version: 1 }
    }

    #[test]
    fn separable_classes_are_learned() {
        let train = Table::parse("x,y\n-1,0\n-0.5,0\n0.5,1\n1,1\n", Path::new("t.csv")).unwrap();
        let model = fit(&graph(), &train, 1, "fp").unwrap();
        assert_eq!(model.train_accuracy, 1.0);
        assert_eq!(model.centroids["0"]["x"], -0.75);

        // tabla cruda: 10 se normaliza a 1.0
        let raw = Table::parse("x,y\n10,1\n0,0\n", Path::new("r.csv")).unwrap();
        assert_eq!(accuracy(&model, &raw, true).unwrap(), 1.0);
    }

    #[test]
    fn single_class_is_rejected() {
        let train = Table::parse("x,y\n1,1\n2,1\n", Path::new("t.csv")).unwrap();
        assert!(fit(&graph(), &train, 1, "fp").is_err());
    }
}
