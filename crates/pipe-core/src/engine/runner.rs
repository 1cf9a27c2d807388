//! DAG runner: recorre el pipeline en orden topológico.
//!
//! - Secuencial: un componente a la vez, en orden topológico.
//! - Paralelo: por niveles de dependencia sobre un pool de rayon; dentro de
//!   un nivel ningún componente depende de otro.
//!
//! Ante `ComponentFailure` los dependientes transitivos no se ejecutan (no
//! se registra nada para ellos), los componentes independientes siguen y al
//! final se devuelve el primer fallo. Cualquier otro error aborta la corrida
//! de inmediato.
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::Utc;
use log::{error, info, warn};
use rayon::prelude::*;

use super::executor::ComponentExecutor;
use super::layout::OutputLayout;
use super::result::{ComponentOutcome, PipelineRunResult};
use crate::cache::{CacheKeyResolver, KeyLocks};
use crate::component::ComponentNode;
use crate::errors::{DagError, EngineError};
use crate::model::PipelineScope;
use crate::pipeline::{dependency_levels, topological_order, PipelineDefinition, RunContext};
use crate::store::MetadataStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheduling {
    #[default]
    Sequential,
    /// Componentes independientes en paralelo; `threads == 0` usa el default
    /// de rayon.
    Parallel { threads: usize },
}

pub struct DagRunner<'s> {
    store: &'s dyn MetadataStore,
    resolver: CacheKeyResolver,
    locks: KeyLocks,
    scheduling: Scheduling,
}

impl<'s> DagRunner<'s> {
    pub fn new(store: &'s dyn MetadataStore) -> Self {
        Self { store,
               resolver: CacheKeyResolver::default(),
               locks: KeyLocks::new(),
               scheduling: Scheduling::Sequential }
    }

    #[inline]
    pub fn with_resolver(mut self, resolver: CacheKeyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Comparte locks con otros runners del mismo proceso.
    #[inline]
    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = locks;
        self
    }

    #[inline]
    pub fn with_scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Ejecuta una corrida completa bajo `pipeline_root`.
    pub fn run(&self, pipeline: &PipelineDefinition, pipeline_root: &Path) -> Result<PipelineRunResult, EngineError> {
        let ctx = RunContext::new(PipelineScope::new(pipeline.name.clone(), pipeline_root),
                                  pipeline.enable_cache);
        self.run_with_context(pipeline, &ctx)
    }

    pub fn run_with_context(&self, pipeline: &PipelineDefinition, ctx: &RunContext) -> Result<PipelineRunResult, EngineError> {
        let graph = pipeline.graph();
        let order = topological_order(&graph).map_err(|remaining| DagError::CycleDetected { remaining })?;
        info!("run {}: pipeline '{}' [{}] with {} components ({:?})",
              ctx.run_id,
              pipeline.name,
              pipeline.definition_hash(),
              pipeline.len(),
              self.scheduling);

        let executor = ComponentExecutor::new(self.store,
                                              self.resolver,
                                              &self.locks,
                                              OutputLayout::new(ctx.scope.pipeline_root.clone()));
        let mut state = RunState::default();

        match self.scheduling {
            Scheduling::Sequential => {
                for &idx in &order {
                    self.step(pipeline, &graph, idx, &mut state, |node, done| executor.execute(node, ctx, done))?;
                }
            }
            Scheduling::Parallel { threads } => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(threads)
                                                          .build()
                                                          .map_err(|e| EngineError::Internal(e.to_string()))?;
                for level in dependency_levels(&graph, &order) {
                    let ready: Vec<usize> = level.into_iter()
                                                 .filter(|&idx| !state.should_skip(&graph, idx))
                                                 .collect();
                    let done = &state.outcomes;
                    let results: Vec<(usize, Result<ComponentOutcome, EngineError>)> = pool.install(|| {
                        ready.par_iter()
                             .filter_map(|&idx| pipeline.component_at(idx).map(|node| (idx, node)))
                             .map(|(idx, node)| (idx, executor.execute(node, ctx, done)))
                             .collect()
                    });
                    for (idx, result) in results {
                        state.record(&graph[idx].0, result)?;
                    }
                }
            }
        }

        let outcomes = order.iter()
                            .filter_map(|&idx| state.outcomes.remove(&graph[idx].0))
                            .collect::<Vec<_>>();
        if let Some(failure) = state.first_failure {
            error!("run {}: finished with failures, skipped {:?}", ctx.run_id, state.skipped);
            return Err(failure);
        }
        info!("run {}: {} components finished in {}ms",
              ctx.run_id,
              outcomes.len(),
              (Utc::now() - ctx.started_at).num_milliseconds());
        Ok(PipelineRunResult { run_id: ctx.run_id,
                               pipeline_name: pipeline.name.clone(),
                               definition_hash: pipeline.definition_hash().to_string(),
                               started_at: ctx.started_at,
                               outcomes })
    }

    fn step<F>(&self,
               pipeline: &PipelineDefinition,
               graph: &[(String, Vec<String>)],
               idx: usize,
               state: &mut RunState,
               execute: F)
               -> Result<(), EngineError>
        where F: Fn(&ComponentNode, &BTreeMap<String, ComponentOutcome>) -> Result<ComponentOutcome, EngineError>
    {
        if state.should_skip(graph, idx) {
            return Ok(());
        }
        let node = pipeline.component_at(idx)
                           .ok_or_else(|| EngineError::Internal(format!("component index {idx} out of range")))?;
        let result = execute(node, &state.outcomes);
        state.record(&graph[idx].0, result)
    }
}

#[derive(Default)]
struct RunState {
    outcomes: BTreeMap<String, ComponentOutcome>,
    failed: HashSet<String>,
    skipped: Vec<String>,
    first_failure: Option<EngineError>,
}

impl RunState {
    /// `true` (y lo anota) si algún upstream falló o fue saltado.
    fn should_skip(&mut self, graph: &[(String, Vec<String>)], idx: usize) -> bool {
        let (name, upstreams) = &graph[idx];
        let blocked = upstreams.iter()
                               .any(|u| self.failed.contains(u) || self.skipped.contains(u));
        if blocked {
            warn!("{name}: skipped, an upstream component did not complete");
            self.skipped.push(name.clone());
        }
        blocked
    }

    fn record(&mut self, name: &str, result: Result<ComponentOutcome, EngineError>) -> Result<(), EngineError> {
        match result {
            Ok(outcome) => {
                self.outcomes.insert(name.to_string(), outcome);
                Ok(())
            }
            Err(e) if !e.is_fatal() => {
                self.failed.insert(name.to_string());
                if self.first_failure.is_none() {
                    self.first_failure = Some(e);
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
