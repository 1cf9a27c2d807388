//! Pipeline taxi: diez componentes, un importer de schema de usuario y un
//! resolver del último modelo bendecido como baseline del Evaluator.

use std::path::{Path, PathBuf};

use pipe_core::hashing::fingerprint_path;
use pipe_core::{ComponentSpec, PipelineBuilder, PipelineDefinition};
use serde_json::json;

use crate::artifacts::{EXAMPLES, EXAMPLE_ANOMALIES, EXAMPLE_STATISTICS, EXTERNAL_ARTIFACT, MODEL, MODEL_BLESSING,
                       MODEL_EVALUATION, PUSHED_MODEL, SCHEMA, TRANSFORM_GRAPH};
use crate::components::{CsvExampleGen, Evaluator, ExampleValidator, Importer, LatestBlessedModelResolver, Pusher,
                        SchemaGen, StatisticsGen, Trainer, Transform, DEFAULT_ACCURACY_THRESHOLD};
use crate::error::AdapterError;

pub const COMPONENT_COUNT: usize = 10;

/// Parámetros de invocación del pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxiPipelineParams {
    pub pipeline_name: String,
    /// Directorio con los CSV de entrada.
    pub data_root: PathBuf,
    /// Directorio con el `schema.json` provisto por el usuario.
    pub user_schema_path: PathBuf,
    pub module_file: PathBuf,
    pub serving_model_dir: PathBuf,
    pub pipeline_root: PathBuf,
    pub enable_cache: bool,
    pub accuracy_threshold: f64,
}

impl TaxiPipelineParams {
    /// Layout convencional: datos bajo `taxi_root` (`simple/`,
    /// `user_provided_schema/`, `taxi_utils.json`) y salidas bajo
    /// `work_dir` (`tfx/pipelines/<name>`, `serving_model/<name>`).
    pub fn new(pipeline_name: impl Into<String>, taxi_root: &Path, work_dir: &Path) -> Self {
        let pipeline_name = pipeline_name.into();
        Self { data_root: taxi_root.join("simple"),
               user_schema_path: taxi_root.join("user_provided_schema"),
               module_file: taxi_root.join("taxi_utils.json"),
               serving_model_dir: work_dir.join("serving_model").join(&pipeline_name),
               pipeline_root: work_dir.join("tfx").join("pipelines").join(&pipeline_name),
               enable_cache: true,
               accuracy_threshold: DEFAULT_ACCURACY_THRESHOLD,
               pipeline_name }
    }
}

pub fn create_pipeline(params: &TaxiPipelineParams) -> Result<PipelineDefinition, AdapterError> {
    let module_fingerprint =
        fingerprint_path(&params.module_file).map_err(|e| AdapterError::io(&params.module_file, e))?;
    let module = json!({
        "module_file": params.module_file.to_string_lossy(),
        "module_fingerprint": module_fingerprint,
    });

    let pipeline =
        PipelineBuilder::new(params.pipeline_name.clone())
            .component(ComponentSpec::new("CsvExampleGen").external_input("input_base", EXTERNAL_ARTIFACT, &params.data_root)
                                                          .output("examples", EXAMPLES),
                       CsvExampleGen)
            .component(ComponentSpec::new("Importer").external_input("source", SCHEMA, &params.user_schema_path)
                                                     .output("result", SCHEMA),
                       Importer)
            .component(ComponentSpec::new("StatisticsGen").input("examples", EXAMPLES, "CsvExampleGen", "examples")
                                                          .output("statistics", EXAMPLE_STATISTICS),
                       StatisticsGen)
            .component(ComponentSpec::new("SchemaGen").input("statistics", EXAMPLE_STATISTICS, "StatisticsGen", "statistics")
                                                      .output("schema", SCHEMA),
                       SchemaGen)
            .component(ComponentSpec::new("ExampleValidator").input("statistics",
                                                                    EXAMPLE_STATISTICS,
                                                                    "StatisticsGen",
                                                                    "statistics")
                                                             .input("schema", SCHEMA, "Importer", "result")
                                                             .output("anomalies", EXAMPLE_ANOMALIES),
                       ExampleValidator)
            .component(ComponentSpec::new("Transform").input("examples", EXAMPLES, "CsvExampleGen", "examples")
                                                      .input("schema", SCHEMA, "Importer", "result")
                                                      .output("transform_graph", TRANSFORM_GRAPH)
                                                      .output("transformed_examples", EXAMPLES)
                                                      .config(module.clone()),
                       Transform)
            .component(ComponentSpec::new("Trainer").input("examples", EXAMPLES, "Transform", "transformed_examples")
                                                    .input("transform_graph", TRANSFORM_GRAPH, "Transform", "transform_graph")
                                                    .input("schema", SCHEMA, "Importer", "result")
                                                    .output("model", MODEL)
                                                    .config(module),
                       Trainer)
            .component(ComponentSpec::new("LatestBlessedModelResolver").output("model", MODEL)
                                                                       .always_fresh(),
                       LatestBlessedModelResolver)
            .component(ComponentSpec::new("Evaluator").input("examples", EXAMPLES, "CsvExampleGen", "examples")
                                                      .input("model", MODEL, "Trainer", "model")
                                                      .optional_input("baseline_model",
                                                                      MODEL,
                                                                      "LatestBlessedModelResolver",
                                                                      "model")
                                                      .output("evaluation", MODEL_EVALUATION)
                                                      .output("blessing", MODEL_BLESSING)
                                                      .config(json!({ "accuracy_threshold": params.accuracy_threshold })),
                       Evaluator)
            .component(ComponentSpec::new("Pusher").input("model", MODEL, "Trainer", "model")
                                                   .input("blessing", MODEL_BLESSING, "Evaluator", "blessing")
                                                   .output("pushed_model", PUSHED_MODEL)
                                                   .config(json!({
                                                       "serving_model_dir": params.serving_model_dir.to_string_lossy(),
                                                   })),
                       Pusher)
            .enable_cache(params.enable_cache)
            .build()?;
    Ok(pipeline)
}
