//! Definición estática del pipeline, su builder y el contexto de corrida.

pub mod builder;
pub mod context;
pub mod definition;
pub mod topology;

pub use builder::PipelineBuilder;
pub use context::RunContext;
pub use definition::PipelineDefinition;
pub use topology::{dependency_levels, find_cycle, topological_order};
