use std::fmt::Debug;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ComponentRunResult;
use crate::model::{CachingPolicy, ExecutionContext};

/// Capacidad única de un componente. Implementaciones deben depender sólo
/// de los inputs y la configuración del contexto; cualquier otra fuente de
/// variación invalida las garantías de cache.
pub trait Component: Send + Sync + Debug {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult;
}

/// Origen de un canal de entrada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSource {
    /// Output `output` del componente `component`.
    Upstream { component: String, output: String },
    /// Datos externos: el executor los importa como artifact (idempotente).
    External { uri: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputChannel {
    pub name: String,
    pub type_name: String,
    pub source: ChannelSource,
    /// Si es `true`, el upstream puede publicar cero artifacts en el canal.
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputChannel {
    pub name: String,
    pub type_name: String,
}

/// Declaración de un componente: todo lo que el engine necesita saber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub inputs: Vec<InputChannel>,
    pub outputs: Vec<OutputChannel>,
    pub config: Value,
    pub caching: CachingPolicy,
    /// Versión de la implementación; cambiarla invalida la cache.
    pub version: String,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               inputs: Vec::new(),
               outputs: Vec::new(),
               config: Value::Object(Default::default()),
               caching: CachingPolicy::Cacheable,
               version: "1".to_string() }
    }

    pub fn input(mut self, name: &str, type_name: &str, upstream: &str, output: &str) -> Self {
        self.inputs.push(InputChannel { name: name.to_string(),
                                        type_name: type_name.to_string(),
                                        source: ChannelSource::Upstream { component: upstream.to_string(),
                                                                          output: output.to_string() },
                                        optional: false });
        self
    }

    pub fn optional_input(mut self, name: &str, type_name: &str, upstream: &str, output: &str) -> Self {
        self = self.input(name, type_name, upstream, output);
        if let Some(last) = self.inputs.last_mut() {
            last.optional = true;
        }
        self
    }

    pub fn external_input(mut self, name: &str, type_name: &str, uri: impl Into<PathBuf>) -> Self {
        self.inputs.push(InputChannel { name: name.to_string(),
                                        type_name: type_name.to_string(),
                                        source: ChannelSource::External { uri: uri.into() },
                                        optional: false });
        self
    }

    pub fn output(mut self, name: &str, type_name: &str) -> Self {
        self.outputs.push(OutputChannel { name: name.to_string(),
                                          type_name: type_name.to_string() });
        self
    }

    pub fn config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn caching(mut self, caching: CachingPolicy) -> Self {
        self.caching = caching;
        self
    }

    pub fn always_fresh(self) -> Self {
        self.caching(CachingPolicy::AlwaysFresh)
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn output_channel(&self, name: &str) -> Option<&OutputChannel> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Componentes upstream distintos, en orden de declaración de inputs.
    pub fn upstream_components(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for input in &self.inputs {
            if let ChannelSource::Upstream { component, .. } = &input.source {
                if !out.contains(&component.as_str()) {
                    out.push(component);
                }
            }
        }
        out
    }
}

/// Declaración + body: el nodo que el DAG runner recorre.
#[derive(Debug)]
pub struct ComponentNode {
    pub spec: ComponentSpec,
    pub body: Box<dyn Component>,
}

impl ComponentNode {
    pub fn new(spec: ComponentSpec, body: impl Component + 'static) -> Self {
        Self { spec,
               body: Box::new(body) }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}
