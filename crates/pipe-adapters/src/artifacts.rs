//! Artifacts tipados de los componentes taxi.
//!
//! Definen sólo la forma del `payload` JSON; el core calcula el fingerprint
//! a partir del payload canónico. Los archivos de datos (CSV, modelo) viven
//! en el directorio del artifact (`uri`).

use std::collections::BTreeMap;

use pipe_core::typed_artifact;
use serde::{Deserialize, Serialize};

pub const EXAMPLES: &str = "Examples";
pub const SCHEMA: &str = "Schema";
pub const EXAMPLE_STATISTICS: &str = "ExampleStatistics";
pub const EXAMPLE_ANOMALIES: &str = "ExampleAnomalies";
pub const TRANSFORM_GRAPH: &str = "TransformGraph";
pub const MODEL: &str = "Model";
pub const MODEL_EVALUATION: &str = "ModelEvaluation";
pub const MODEL_BLESSING: &str = "ModelBlessing";
pub const PUSHED_MODEL: &str = "PushedModel";
pub const EXTERNAL_ARTIFACT: &str = pipe_core::engine::EXTERNAL_ARTIFACT_TYPE;

/// Archivo de datos dentro de cada split: `<uri>/<split>/data.csv`.
pub const SPLIT_DATA_FILE: &str = "data.csv";
/// Archivo de schema dentro de un artifact `Schema` importado.
pub const SCHEMA_FILE: &str = "schema.json";
/// Subdirectorio del modelo exportable dentro del artifact `Model`.
pub const SERVING_MODEL_DIR: &str = "serving_model";
pub const MODEL_FILE: &str = "model.json";

// Ejemplos particionados en splits (train/eval).
typed_artifact!(ExamplesArtifact {
    num_rows: u64,
    columns: Vec<String>,
    splits: BTreeMap<String, u64>,
} type_name: "Examples");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Float,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
    pub required: bool,
}

typed_artifact!(SchemaArtifact { features: Vec<FeatureSpec> } type_name: "Schema");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub count: u64,
    pub missing: u64,
    pub unique: u64,
    /// Presente sólo si todos los valores no vacíos son numéricos.
    pub numeric: Option<NumericStats>,
}

typed_artifact!(StatisticsArtifact {
    num_examples: u64,
    features: BTreeMap<String, FeatureStats>,
} type_name: "ExampleStatistics");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub feature: String,
    pub description: String,
}

typed_artifact!(AnomaliesArtifact { anomalies: Vec<Anomaly> } type_name: "ExampleAnomalies");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub mean: f64,
    pub std_dev: f64,
}

impl Normalizer {
    pub fn apply(&self, v: f64) -> f64 {
        if self.std_dev > 0.0 {
            (v - self.mean) / self.std_dev
        } else {
            0.0
        }
    }
}

typed_artifact!(TransformGraphArtifact {
    label_key: String,
    numeric: BTreeMap<String, Normalizer>,
    vocabularies: BTreeMap<String, Vec<String>>,
} type_name: "TransformGraph");

// Clasificador por centroides sobre features numéricas normalizadas.
typed_artifact!(ModelArtifact {
    label_key: String,
    normalizers: BTreeMap<String, Normalizer>,
    centroids: BTreeMap<String, BTreeMap<String, f64>>,
    train_accuracy: f64,
    train_steps: u64,
    module_fingerprint: String,
} type_name: "Model");

typed_artifact!(EvaluationArtifact {
    accuracy: f64,
    baseline_accuracy: Option<f64>,
    eval_examples: u64,
} type_name: "ModelEvaluation");

typed_artifact!(BlessingArtifact { blessed: bool } type_name: "ModelBlessing");

typed_artifact!(PushedModelArtifact {
    pushed: bool,
    destination: Option<String>,
} type_name: "PushedModel");
