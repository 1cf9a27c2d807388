//! Componentes del pipeline.
//!
//! Un componente es una unidad opaca: el engine sólo conoce su declaración
//! (`ComponentSpec`: nombre, canales, configuración, política de cache) y la
//! capacidad `Component::run`. Nunca inspecciona el tipo concreto.

pub mod definition;
mod run_result;

pub use definition::{ChannelSource, Component, ComponentNode, ComponentSpec, InputChannel, OutputChannel};
pub use run_result::{ComponentOutputs, ComponentRunResult};
