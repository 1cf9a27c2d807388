//! Definición inmutable del pipeline.
//!
//! Se valida por completo al construirse: nombres únicos, referencias a
//! outputs declarados, tipos compatibles y ausencia de ciclos. Un
//! `PipelineDefinition` existente es siempre un DAG válido.
use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::json;

use super::topology::{find_cycle, topological_order};
use crate::component::{ChannelSource, ComponentNode};
use crate::errors::DefinitionError;
use crate::hashing::hash_value;

#[derive(Debug)]
pub struct PipelineDefinition {
    pub name: String,
    /// Con `false` todos los componentes se ejecutan como always-fresh.
    pub enable_cache: bool,
    components: IndexMap<String, ComponentNode>,
    definition_hash: String,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>,
               nodes: Vec<ComponentNode>,
               enable_cache: bool)
               -> Result<Self, DefinitionError> {
        let mut components: IndexMap<String, ComponentNode> = IndexMap::with_capacity(nodes.len());
        for node in nodes {
            if node.spec.name.trim().is_empty() {
                return Err(DefinitionError::EmptyName);
            }
            check_unique_channels(&node)?;
            if components.contains_key(&node.spec.name) {
                return Err(DefinitionError::DuplicateComponent(node.spec.name.clone()));
            }
            components.insert(node.spec.name.clone(), node);
        }

        for node in components.values() {
            for input in &node.spec.inputs {
                let ChannelSource::Upstream { component, output } = &input.source else {
                    continue;
                };
                let upstream = components.get(component)
                                         .ok_or_else(|| DefinitionError::UnknownComponent { component: node.spec.name.clone(),
                                                                                            input: input.name.clone(),
                                                                                            upstream: component.clone() })?;
                let out = upstream.spec
                                  .output_channel(output)
                                  .ok_or_else(|| DefinitionError::UnknownOutput { component: node.spec.name.clone(),
                                                                                  input: input.name.clone(),
                                                                                  upstream: component.clone(),
                                                                                  output: output.clone() })?;
                if out.type_name != input.type_name {
                    return Err(DefinitionError::TypeMismatch { component: node.spec.name.clone(),
                                                               input: input.name.clone(),
                                                               upstream: component.clone(),
                                                               output: output.clone(),
                                                               expected: input.type_name.clone(),
                                                               found: out.type_name.clone() });
                }
            }
        }

        let graph = dependency_graph(&components);
        if let Err(remaining) = topological_order(&graph) {
            let path = find_cycle(&graph).unwrap_or(remaining);
            return Err(DefinitionError::Cycle { path });
        }

        let name = name.into();
        let definition_hash = compute_definition_hash(&name, &components);
        Ok(Self { name,
                  enable_cache,
                  components,
                  definition_hash })
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ComponentNode> {
        self.components.get(name)
    }

    /// Nodos en orden de declaración.
    pub fn components(&self) -> impl Iterator<Item = &ComponentNode> {
        self.components.values()
    }

    pub fn component_at(&self, index: usize) -> Option<&ComponentNode> {
        self.components.get_index(index).map(|(_, n)| n)
    }

    /// `(nombre, upstreams)` en orden de declaración.
    pub fn graph(&self) -> Vec<(String, Vec<String>)> {
        dependency_graph(&self.components)
    }

    /// Hash estable de la forma del pipeline (nombres, canales, config).
    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }
}

fn check_unique_channels(node: &ComponentNode) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();
    for name in node.spec.inputs.iter().map(|i| &i.name) {
        if !seen.insert(name) {
            return Err(DefinitionError::DuplicateChannel { component: node.spec.name.clone(),
                                                           channel: name.clone() });
        }
    }
    let mut seen = HashSet::new();
    for name in node.spec.outputs.iter().map(|o| &o.name) {
        if !seen.insert(name) {
            return Err(DefinitionError::DuplicateChannel { component: node.spec.name.clone(),
                                                           channel: name.clone() });
        }
    }
    Ok(())
}

fn dependency_graph(components: &IndexMap<String, ComponentNode>) -> Vec<(String, Vec<String>)> {
    components.values()
              .map(|n| {
                  (n.spec.name.clone(),
                   n.spec.upstream_components().into_iter().map(str::to_string).collect())
              })
              .collect()
}

fn compute_definition_hash(name: &str, components: &IndexMap<String, ComponentNode>) -> String {
    let specs: Vec<serde_json::Value> =
        components.values()
                  .map(|n| {
                      let inputs: Vec<serde_json::Value> = n.spec
                                                            .inputs
                                                            .iter()
                                                            .map(|i| match &i.source {
                                                                ChannelSource::Upstream { component, output } => {
                                                                    json!([i.name, i.type_name, component, output])
                                                                }
                                                                ChannelSource::External { uri } => {
                                                                    json!([i.name, i.type_name, uri.to_string_lossy()])
                                                                }
                                                            })
                                                            .collect();
                      let outputs: Vec<serde_json::Value> =
                          n.spec.outputs.iter().map(|o| json!([o.name, o.type_name])).collect();
                      json!({
                          "name": n.spec.name,
                          "inputs": inputs,
                          "outputs": outputs,
                          "config": n.spec.config,
                          "caching": n.spec.caching.as_str(),
                          "version": n.spec.version,
                      })
                  })
                  .collect();
    hash_value(&json!({ "pipeline": name, "components": specs }))
}
