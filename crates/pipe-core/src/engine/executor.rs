//! Ejecución de un único componente con cache.
//!
//! Secuencia por componente:
//! 1. Resolver inputs (outputs de upstream o importación de datos externos).
//! 2. Calcular la cache key.
//! 3. Registrar la ejecución `running` y su directorio de sistema.
//! 4. Si es cacheable: buscar una ejecución previa con la misma key; si la
//!    hay, marcar `cached` y reutilizar sus outputs.
//! 5. Si no: preparar directorios de salida, invocar el body y publicar.
//!
//! Para componentes cacheables los pasos 3 a 5 corren con el lock de la key
//! tomado.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::layout::OutputLayout;
use super::result::ComponentOutcome;
use crate::cache::{CacheKeyResolver, KeyLocks};
use crate::component::{ChannelSource, ComponentNode, ComponentOutputs, ComponentRunResult};
use crate::errors::{DagError, EngineError, StoreError};
use crate::hashing::{fingerprint_path, hash_value};
use crate::model::{Artifact, ArtifactEvent, CacheKey, CachingPolicy, EventKind, ExecutionContext, ExecutionId,
                   ExecutionState, MetadataReader, OutputArtifact};
use crate::pipeline::RunContext;
use crate::store::{outputs_by_channel, CompletionOutcome, MetadataStore, NewArtifact, NewExecution, PublishedOutput};

/// Tipo con el que se registran datos externos sin tipo declarado.
pub const EXTERNAL_ARTIFACT_TYPE: &str = "ExternalArtifact";

pub struct ComponentExecutor<'a> {
    store: &'a dyn MetadataStore,
    resolver: CacheKeyResolver,
    locks: &'a KeyLocks,
    layout: OutputLayout,
}

impl<'a> ComponentExecutor<'a> {
    pub fn new(store: &'a dyn MetadataStore, resolver: CacheKeyResolver, locks: &'a KeyLocks, layout: OutputLayout) -> Self {
        Self { store,
               resolver,
               locks,
               layout }
    }

    /// Ejecuta `node` dentro de la corrida `ctx`. `upstream` contiene los
    /// resultados de los componentes ya terminados.
    pub fn execute(&self,
                   node: &ComponentNode,
                   ctx: &RunContext,
                   upstream: &BTreeMap<String, ComponentOutcome>)
                   -> Result<ComponentOutcome, EngineError> {
        let inputs = self.resolve_inputs(node, upstream)?;
        let key = self.resolver.key_for(&node.spec, &inputs);
        let caching = if ctx.enable_cache {
            node.spec.caching
        } else {
            CachingPolicy::AlwaysFresh
        };
        debug!("executor: component={} key={} caching={}", node.name(), key, caching.as_str());

        match caching {
            CachingPolicy::Cacheable => self.locks.with_lock(&ctx.scope, node.name(), &key, || {
                                                    self.run_keyed(node, ctx, &inputs, key.clone(), caching)
                                                }),
            CachingPolicy::AlwaysFresh => self.run_keyed(node, ctx, &inputs, key, caching),
        }
    }

    fn resolve_inputs(&self,
                      node: &ComponentNode,
                      upstream: &BTreeMap<String, ComponentOutcome>)
                      -> Result<BTreeMap<String, Vec<Artifact>>, EngineError> {
        let mut inputs = BTreeMap::new();
        for input in &node.spec.inputs {
            let artifacts = match &input.source {
                ChannelSource::Upstream { component, output } => {
                    let outcome = upstream.get(component)
                                          .ok_or_else(|| DagError::UpstreamNotRun { component: node.name().to_string(),
                                                                                    upstream: component.clone() })?;
                    outcome.output(output).to_vec()
                }
                ChannelSource::External { uri } => vec![self.import_external(&input.type_name, uri)?],
            };
            if artifacts.is_empty() && !input.optional {
                return Err(DagError::MissingInput { component: node.name().to_string(),
                                                    input: input.name.clone() }.into());
            }
            inputs.insert(input.name.clone(), artifacts);
        }
        Ok(inputs)
    }

    fn import_external(&self, type_name: &str, uri: &Path) -> Result<Artifact, EngineError> {
        let fingerprint = fingerprint_path(uri).map_err(|e| EngineError::io(uri, e))?;
        let type_name = if type_name.is_empty() {
            EXTERNAL_ARTIFACT_TYPE
        } else {
            type_name
        };
        let artifact = self.store
                           .register_external_artifact(type_name, &uri.to_string_lossy(), &fingerprint)?;
        Ok(artifact)
    }

    fn run_keyed(&self,
                 node: &ComponentNode,
                 ctx: &RunContext,
                 inputs: &BTreeMap<String, Vec<Artifact>>,
                 key: CacheKey,
                 caching: CachingPolicy)
                 -> Result<ComponentOutcome, EngineError> {
        let name = node.name();
        let input_events = input_events(inputs);
        let exec_id = self.store.record_execution_start(NewExecution { run_id: ctx.run_id,
                                                                       component: name.to_string(),
                                                                       scope: ctx.scope.clone(),
                                                                       cache_key: key.clone(),
                                                                       caching,
                                                                       inputs: input_events })?;
        let exec_dir = self.layout.create_execution_dir(name, exec_id)?;

        if caching == CachingPolicy::Cacheable {
            if let Some(prior) = self.store.find_cached_execution(name, &key, &ctx.scope)? {
                self.store.mark_cached(exec_id, prior.id, &prior.outputs)?;
                info!("{name}: cache hit (execution {exec_id} reuses {})", prior.id);
                return self.finish(node, exec_id, &exec_dir);
            }
        }

        let output_dirs = self.layout.prepare_output_dirs(name, &node.spec.outputs, exec_id)?;
        let ectx = ExecutionContext { component: name,
                                      execution_id: exec_id,
                                      run_id: ctx.run_id,
                                      scope: &ctx.scope,
                                      inputs,
                                      config: &node.spec.config,
                                      output_dirs: &output_dirs,
                                      metadata: MetadataReader::new(self.store) };

        let outputs = match node.body.run(&ectx) {
            ComponentRunResult::Success { outputs } => outputs,
            ComponentRunResult::Failure { error } => return self.fail(node, exec_id, &exec_dir, error),
        };
        let published = match self.publish(node, outputs, &output_dirs) {
            Ok(p) => p,
            Err(PublishError::Invalid(error)) => return self.fail(node, exec_id, &exec_dir, error),
            Err(PublishError::Engine(e)) => return Err(e),
        };

        match self.store.complete_execution(exec_id, published)? {
            CompletionOutcome::Published { outputs } => {
                info!("{name}: executed (execution {exec_id}, {} outputs)", outputs.len());
            }
            CompletionOutcome::Superseded { winner, .. } => {
                warn!("{name}: execution {exec_id} superseded by {winner}, outputs discarded");
            }
        }
        self.finish(node, exec_id, &exec_dir)
    }

    fn fail(&self,
            node: &ComponentNode,
            exec_id: ExecutionId,
            exec_dir: &Path,
            error: String)
            -> Result<ComponentOutcome, EngineError> {
        warn!("{}: execution {exec_id} failed: {error}", node.name());
        self.store.fail_execution(exec_id, &error)?;
        let execution = self.store.get_execution(exec_id)?;
        OutputLayout::write_execution_record(exec_dir, &execution)?;
        Err(EngineError::ComponentFailure { component: node.name().to_string(),
                                            message: error })
    }

    /// Valida canales y tipos, asigna uri y fingerprint a los frescos y
    /// escribe su `payload.json`.
    fn publish(&self,
               node: &ComponentNode,
               outputs: ComponentOutputs,
               output_dirs: &BTreeMap<String, PathBuf>)
               -> Result<Vec<PublishedOutput>, PublishError> {
        let mut published = Vec::new();
        for (channel, items) in outputs.channels {
            let declared = node.spec
                               .output_channel(&channel)
                               .ok_or_else(|| PublishError::Invalid(format!("undeclared output channel '{channel}'")))?;
            let channel_dir = output_dirs.get(&channel)
                                         .ok_or_else(|| PublishError::Invalid(format!("no output dir for '{channel}'")))?;
            let count = items.len();
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    OutputArtifact::Fresh(draft) => {
                        if draft.type_name != declared.type_name {
                            return Err(PublishError::Invalid(format!("channel '{channel}' expects '{}', got '{}'",
                                                                     declared.type_name, draft.type_name)));
                        }
                        let dir = OutputLayout::artifact_dir(channel_dir, index, count);
                        OutputLayout::write_payload(&dir, &draft.payload)?;
                        let artifact = NewArtifact { type_name: draft.type_name,
                                                     uri: dir.to_string_lossy().into_owned(),
                                                     fingerprint: hash_value(&draft.payload),
                                                     properties: draft.properties,
                                                     payload: draft.payload };
                        published.push(PublishedOutput::Fresh { channel: channel.clone(),
                                                                artifact });
                    }
                    OutputArtifact::Existing(artifact_id) => {
                        let found = match self.store.get_artifacts_by_id(&[artifact_id]) {
                            Ok(found) => found,
                            Err(StoreError::ArtifactNotFound(_)) => Vec::new(),
                            Err(e) => return Err(EngineError::from(e).into()),
                        };
                        let a = found.first()
                                     .ok_or_else(|| PublishError::Invalid(format!("unknown artifact {artifact_id}")))?;
                        if a.type_name != declared.type_name {
                            return Err(PublishError::Invalid(format!("channel '{channel}' expects '{}', artifact {artifact_id} is '{}'",
                                                                     declared.type_name, a.type_name)));
                        }
                        published.push(PublishedOutput::Existing { channel: channel.clone(),
                                                                   artifact_id });
                    }
                }
            }
        }
        Ok(published)
    }

    /// Relee la ejecución terminada, escribe `execution.json` y arma el
    /// resultado con todos los canales declarados.
    fn finish(&self, node: &ComponentNode, exec_id: ExecutionId, exec_dir: &Path) -> Result<ComponentOutcome, EngineError> {
        let execution = self.store.get_execution(exec_id)?;
        OutputLayout::write_execution_record(exec_dir, &execution)?;

        let mut outputs: BTreeMap<String, Vec<Artifact>> =
            node.spec.outputs.iter().map(|o| (o.name.clone(), Vec::new())).collect();
        for (channel, ids) in outputs_by_channel(&execution.outputs) {
            outputs.insert(channel, self.store.get_artifacts_by_id(&ids)?);
        }
        debug_assert!(execution.state != ExecutionState::Running);
        Ok(ComponentOutcome { component: node.name().to_string(),
                              state: execution.state,
                              execution_id: exec_id,
                              outputs })
    }
}

enum PublishError {
    /// Outputs inválidos del componente: cuentan como fallo del componente.
    Invalid(String),
    Engine(EngineError),
}

impl From<EngineError> for PublishError {
    fn from(e: EngineError) -> Self {
        PublishError::Engine(e)
    }
}

fn input_events(inputs: &BTreeMap<String, Vec<Artifact>>) -> Vec<ArtifactEvent> {
    inputs.iter()
          .flat_map(|(channel, artifacts)| {
              artifacts.iter().enumerate().map(move |(position, a)| ArtifactEvent { kind: EventKind::Input,
                                                                                      channel: channel.clone(),
                                                                                      position,
                                                                                      artifact_id: a.id })
          })
          .collect()
}
