//! CLI de pipeflow: `run` ejecuta el pipeline taxi una vez; `inspect`
//! resume un store SQLite existente.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pipe_core::{ExecutionState, Scheduling};
use pipe_persistence::{with_store, ConnectionConfig};
use pipeflow::{run_pipeline, summarize_store, AppConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pipeflow", version, about = "Cached DAG pipeline runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ejecuta el pipeline taxi una vez.
    Run {
        /// Archivo SQLite de metadata (`:memory:` para el store en memoria).
        /// Default: `<work_dir>/tfx/metadata/<pipeline>/metadata.db`.
        #[arg(long)]
        metadata: Option<PathBuf>,
        #[arg(long)]
        pipeline_name: Option<String>,
        /// Directorio taxi (`simple/`, `user_provided_schema/`, `taxi_utils.json`).
        #[arg(long)]
        data_root: Option<PathBuf>,
        #[arg(long)]
        work_dir: Option<PathBuf>,
        #[arg(long)]
        pipeline_root: Option<PathBuf>,
        #[arg(long)]
        serving_dir: Option<PathBuf>,
        /// Fuerza ejecución fresca de todos los componentes.
        #[arg(long)]
        no_cache: bool,
        /// Ejecuta niveles independientes en paralelo con N hilos (0 = default de rayon).
        #[arg(long)]
        parallel: Option<usize>,
        /// Imprime el resultado como JSON.
        #[arg(long)]
        json: bool,
    },
    /// Resume executions y artifacts de un store SQLite.
    Inspect {
        #[arg(long)]
        metadata: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    match cli.command {
        Command::Run { metadata,
                       pipeline_name,
                       data_root,
                       work_dir,
                       pipeline_root,
                       serving_dir,
                       no_cache,
                       parallel,
                       json, } => {
            if let Some(path) = metadata {
                config.metadata = Some(ConnectionConfig::from_path(path));
            }
            if let Some(name) = pipeline_name {
                config.pipeline_name = name;
            }
            if let Some(dir) = data_root {
                config.data_root = dir;
            }
            if let Some(dir) = work_dir {
                config.work_dir = dir;
            }
            config.pipeline_root = pipeline_root.or(config.pipeline_root);
            config.serving_model_dir = serving_dir.or(config.serving_model_dir);
            if no_cache {
                config.enable_cache = false;
            }
            let scheduling = parallel.map_or(Scheduling::Sequential, |threads| Scheduling::Parallel { threads });

            let params = config.pipeline_params();
            let summary = run_pipeline(&params, &config.metadata_config(), scheduling)
                .with_context(|| format!("pipeline '{}' failed", params.pipeline_name))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for outcome in &summary.result.outcomes {
                    println!("{:<28} {:<9} execution {}",
                             outcome.component,
                             outcome.state.as_str(),
                             outcome.execution_id);
                }
                println!("fresh: {}, cached: {}, store: {} executions / {} artifacts",
                         summary.result.count_in_state(ExecutionState::Complete),
                         summary.result.count_in_state(ExecutionState::Cached),
                         summary.executions,
                         summary.artifacts);
            }
            info!(run_id = %summary.result.run_id, "run finished");
        }
        Command::Inspect { metadata, json } => {
            if let Some(path) = metadata {
                config.metadata = Some(ConnectionConfig::from_path(path));
            }
            let metadata = config.metadata_config();
            match &metadata {
                ConnectionConfig::InMemory => {
                    bail!("inspect needs a SQLite metadata path (--metadata or PIPEFLOW_METADATA_PATH)")
                }
                ConnectionConfig::Sqlite { path, .. } if !path.is_file() => {
                    bail!("no metadata store at {}", path.display())
                }
                ConnectionConfig::Sqlite { .. } => {}
            }
            let summary = with_store(&metadata, |store| summarize_store(store))?
                .with_context(|| format!("reading {}", metadata.describe()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}: {} executions, {} artifacts",
                         metadata.describe(),
                         summary.executions,
                         summary.artifacts);
                for (state, n) in &summary.executions_by_state {
                    println!("  state {state:<10} {n}");
                }
                for (component, n) in &summary.executions_by_component {
                    println!("  component {component:<28} {n}");
                }
                for (type_name, n) in &summary.artifacts_by_type {
                    println!("  type {type_name:<20} {n}");
                }
            }
        }
    }
    Ok(())
}
