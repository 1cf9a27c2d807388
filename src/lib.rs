//! pipeflow: pipeline taxi sobre el engine con cache y metadata durable.
//!
//! `run_pipeline` abre el store configurado, construye el pipeline y lo
//! ejecuta una vez; `summarize_store` resume el contenido del store.

pub mod config;

use std::collections::BTreeMap;

use log::info;
use pipe_adapters::{create_pipeline, AdapterError, TaxiPipelineParams};
use pipe_core::{DagRunner, EngineError, MetadataStore, PipelineRunResult, Scheduling, StoreError};
use pipe_persistence::{open_store, ConnectionConfig, PersistenceError};
use serde::Serialize;
use thiserror::Error;

pub use config::AppConfig;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resultado de una corrida más los totales del store tras ella.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub result: PipelineRunResult,
    pub artifacts: usize,
    pub executions: usize,
}

/// Conteos del store agrupados por estado y por tipo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub executions: usize,
    pub artifacts: usize,
    pub executions_by_state: BTreeMap<String, usize>,
    pub executions_by_component: BTreeMap<String, usize>,
    pub artifacts_by_type: BTreeMap<String, usize>,
}

/// Abre el store de `metadata`, ejecuta el pipeline y lo libera.
pub fn run_pipeline(params: &TaxiPipelineParams,
                    metadata: &ConnectionConfig,
                    scheduling: Scheduling)
                    -> Result<RunSummary, RunError> {
    info!("metadata: {}", metadata.describe());
    let handle = open_store(metadata)?;
    run_pipeline_with_store(params, handle.store(), scheduling)
}

/// Igual que `run_pipeline` sobre un store ya abierto (varias corridas
/// contra el mismo store en memoria).
pub fn run_pipeline_with_store(params: &TaxiPipelineParams,
                               store: &dyn MetadataStore,
                               scheduling: Scheduling)
                               -> Result<RunSummary, RunError> {
    let pipeline = create_pipeline(params)?;
    let result = DagRunner::new(store).with_scheduling(scheduling)
                                      .run(&pipeline, &params.pipeline_root)?;
    let summary = RunSummary { result,
                               artifacts: store.get_artifacts()?.len(),
                               executions: store.get_executions()?.len() };
    info!("pipeline '{}': {} executions, {} artifacts in store",
          params.pipeline_name,
          summary.executions,
          summary.artifacts);
    Ok(summary)
}

pub fn summarize_store(store: &dyn MetadataStore) -> Result<StoreSummary, StoreError> {
    let executions = store.get_executions()?;
    let artifacts = store.get_artifacts()?;
    let mut summary = StoreSummary { executions: executions.len(),
                                     artifacts: artifacts.len(),
                                     ..StoreSummary::default() };
    for e in &executions {
        *summary.executions_by_state.entry(e.state.to_string()).or_default() += 1;
        *summary.executions_by_component.entry(e.component.clone()).or_default() += 1;
    }
    for a in &artifacts {
        *summary.artifacts_by_type.entry(a.type_name.clone()).or_default() += 1;
    }
    Ok(summary)
}
