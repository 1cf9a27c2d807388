//! Engine: ejecución de componentes con cache y recorrido del DAG.

pub mod executor;
pub mod layout;
pub mod result;
pub mod runner;

pub use executor::{ComponentExecutor, EXTERNAL_ARTIFACT_TYPE};
pub use layout::OutputLayout;
pub use result::{ComponentOutcome, PipelineRunResult};
pub use runner::{DagRunner, Scheduling};
