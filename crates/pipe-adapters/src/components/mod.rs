//! Componentes de referencia del pipeline taxi.
//!
//! Cada componente es un `Component` opaco para el engine: lee sus inputs
//! del contexto, escribe archivos sólo bajo sus directorios de salida y
//! devuelve artifacts tipados (`crate::artifacts`).

mod evaluator;
mod example_gen;
mod example_validator;
mod importer;
mod pusher;
mod resolver;
mod schema_gen;
mod statistics_gen;
mod trainer;
mod transform;

use std::path::Path;

use log::error;
use pipe_core::model::ArtifactSpec;
use pipe_core::{Artifact, ComponentOutputs, ComponentRunResult, ExecutionContext};

pub use evaluator::{Evaluator, DEFAULT_ACCURACY_THRESHOLD};
pub use example_gen::{CsvExampleGen, EVAL_SPLIT, TRAIN_SPLIT};
pub use example_validator::ExampleValidator;
pub use importer::Importer;
pub use pusher::Pusher;
pub use resolver::LatestBlessedModelResolver;
pub use schema_gen::SchemaGen;
pub use statistics_gen::StatisticsGen;
pub use trainer::Trainer;
pub use transform::Transform;

use crate::artifacts::{SchemaArtifact, FeatureSpec, SCHEMA_FILE, SPLIT_DATA_FILE};
use crate::error::AdapterError;
use crate::module_file::ModuleSpec;
use crate::table::Table;

/// Convierte el resultado de un body en `ComponentRunResult`.
pub(crate) fn finish(ctx: &ExecutionContext<'_>, result: Result<ComponentOutputs, AdapterError>) -> ComponentRunResult {
    match result {
        Ok(outputs) => ComponentRunResult::success(outputs),
        Err(e) => {
            error!("{} (execution {}): {e}", ctx.component, ctx.execution_id);
            ComponentRunResult::failure(e.to_string())
        }
    }
}

pub(crate) fn single_input<'c>(ctx: &'c ExecutionContext<'_>, channel: &str) -> Result<&'c Artifact, AdapterError> {
    ctx.single_input(channel).map_err(AdapterError::Invalid)
}

pub(crate) fn output_dir<'c>(ctx: &'c ExecutionContext<'_>, channel: &str) -> Result<&'c Path, AdapterError> {
    ctx.output_dir(channel)
       .ok_or_else(|| AdapterError::Invalid(format!("{}: no output directory for '{channel}'", ctx.component)))
}

/// Split `split` de un artifact `Examples`.
pub(crate) fn read_split(examples: &Artifact, split: &str) -> Result<Table, AdapterError> {
    Table::read(&Path::new(&examples.uri).join(split).join(SPLIT_DATA_FILE))
}

#[derive(serde::Deserialize)]
struct SchemaFile {
    features: Vec<FeatureSpec>,
}

/// Schema desde un artifact producido (payload) o importado (`schema.json`
/// bajo la uri).
pub(crate) fn load_schema(artifact: &Artifact) -> Result<SchemaArtifact, AdapterError> {
    if !artifact.payload.is_null() {
        return Ok(SchemaArtifact::from_artifact(artifact)?);
    }
    let uri = Path::new(&artifact.uri);
    let path = if uri.is_dir() { uri.join(SCHEMA_FILE) } else { uri.to_path_buf() };
    let text = std::fs::read_to_string(&path).map_err(|e| AdapterError::io(&path, e))?;
    let file: SchemaFile = serde_json::from_str(&text).map_err(|e| AdapterError::Format { path: path.clone(),
                                                                                           line: e.line(),
                                                                                           message: e.to_string() })?;
    Ok(SchemaArtifact { features: file.features,
                        schema_version: SchemaArtifact::SCHEMA_VERSION })
}

pub(crate) fn load_module(ctx: &ExecutionContext<'_>) -> Result<ModuleSpec, AdapterError> {
    let path = ctx.config_str("module_file")
                  .ok_or_else(|| AdapterError::Invalid(format!("{}: missing 'module_file' config", ctx.component)))?;
    ModuleSpec::load(Path::new(path))
}
