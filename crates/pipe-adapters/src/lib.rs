//! pipe-adapters: componentes de referencia y pipeline taxi.
//!
//! Los componentes reproducen la forma del pipeline taxi (ingesta,
//! estadísticas, schema, validación, transform, entrenamiento, resolver,
//! evaluación y push) con cómputos ligeros y deterministas, suficientes
//! para ejercitar la cache del engine de punta a punta.

pub mod artifacts;
pub mod components;
pub mod error;
pub mod module_file;
pub mod pipeline;
pub mod table;

pub use error::AdapterError;
pub use module_file::ModuleSpec;
pub use pipeline::{create_pipeline, TaxiPipelineParams, COMPONENT_COUNT};
