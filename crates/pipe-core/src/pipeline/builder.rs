//! Builder para `PipelineDefinition`.
//!
//! Acumula componentes en orden de declaración y delega toda la validación
//! en `PipelineDefinition::new` al llamar `build`.
//!
//! ```ignore
//! let def = PipelineBuilder::new("taxi")
//!     .component(ComponentSpec::new("gen").output("examples", "Examples"), ExampleGen)
//!     .component(ComponentSpec::new("stats").input("examples", "Examples", "gen", "examples"), StatsGen)
//!     .build()?;
//! ```

use super::PipelineDefinition;
use crate::component::{Component, ComponentNode, ComponentSpec};
use crate::errors::DefinitionError;

#[derive(Debug)]
pub struct PipelineBuilder {
    name: String,
    enable_cache: bool,
    nodes: Vec<ComponentNode>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               enable_cache: true,
               nodes: Vec::new() }
    }

    /// Añade un componente (declaración + body).
    #[inline]
    pub fn component(mut self, spec: ComponentSpec, body: impl Component + 'static) -> Self {
        self.nodes.push(ComponentNode::new(spec, body));
        self
    }

    #[inline]
    pub fn node(mut self, node: ComponentNode) -> Self {
        self.nodes.push(node);
        self
    }

    #[inline]
    pub fn enable_cache(mut self, enable: bool) -> Self {
        self.enable_cache = enable;
        self
    }

    pub fn build(self) -> Result<PipelineDefinition, DefinitionError> {
        PipelineDefinition::new(self.name, self.nodes, self.enable_cache)
    }
}
