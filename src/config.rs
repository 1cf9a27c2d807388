//! Configuración central de la aplicación.
//!
//! Carga variables de entorno (.env) una sola vez y arma los parámetros de
//! invocación del pipeline. Los flags de la CLI se aplican encima.
//!
//! - `PIPEFLOW_PIPELINE_NAME` (default `chicago_taxi_beam`)
//! - `PIPEFLOW_DATA_ROOT`: directorio taxi con `simple/`,
//!   `user_provided_schema/` y `taxi_utils.json` (default `data/taxi`)
//! - `PIPEFLOW_WORK_DIR`: raíz de salidas (default `pipeflow_out`)
//! - `PIPEFLOW_PIPELINE_ROOT`, `PIPEFLOW_SERVING_DIR`: sobreescriben el
//!   layout derivado de `PIPEFLOW_WORK_DIR`
//! - `PIPEFLOW_ENABLE_CACHE` (`false`/`0` desactiva la cache)
//! - `PIPEFLOW_METADATA_*`: ver `pipe_persistence::ConnectionConfig`. Sin
//!   `PIPEFLOW_METADATA_PATH` el store es
//!   `<work_dir>/tfx/metadata/<pipeline>/metadata.db`.
use std::env;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use pipe_adapters::TaxiPipelineParams;
use pipe_persistence::ConnectionConfig;

pub const DEFAULT_PIPELINE_NAME: &str = "chicago_taxi_beam";
pub const DEFAULT_DATA_ROOT: &str = "data/taxi";
pub const DEFAULT_WORK_DIR: &str = "pipeflow_out";

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

/// Configuración de una invocación.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub pipeline_name: String,
    pub data_root: PathBuf,
    pub work_dir: PathBuf,
    pub pipeline_root: Option<PathBuf>,
    pub serving_model_dir: Option<PathBuf>,
    pub enable_cache: bool,
    /// Backend explícito; `None` usa el SQLite derivado de `work_dir`.
    pub metadata: Option<ConnectionConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { pipeline_name: DEFAULT_PIPELINE_NAME.to_string(),
               data_root: PathBuf::from(DEFAULT_DATA_ROOT),
               work_dir: PathBuf::from(DEFAULT_WORK_DIR),
               pipeline_root: None,
               serving_model_dir: None,
               enable_cache: true,
               metadata: None }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        Self { pipeline_name: env::var("PIPEFLOW_PIPELINE_NAME").unwrap_or(defaults.pipeline_name),
               data_root: env::var("PIPEFLOW_DATA_ROOT").map(PathBuf::from).unwrap_or(defaults.data_root),
               work_dir: env::var("PIPEFLOW_WORK_DIR").map(PathBuf::from).unwrap_or(defaults.work_dir),
               pipeline_root: env::var("PIPEFLOW_PIPELINE_ROOT").ok().map(PathBuf::from),
               serving_model_dir: env::var("PIPEFLOW_SERVING_DIR").ok().map(PathBuf::from),
               enable_cache: env::var("PIPEFLOW_ENABLE_CACHE").map(|v| parse_flag(&v))
                                                              .unwrap_or(true),
               metadata: ConnectionConfig::from_env() }
    }

    /// Backend de metadata efectivo de la invocación.
    pub fn metadata_config(&self) -> ConnectionConfig {
        self.metadata
            .clone()
            .unwrap_or_else(|| ConnectionConfig::sqlite(self.default_metadata_path()))
    }

    pub fn default_metadata_path(&self) -> PathBuf {
        self.work_dir
            .join("tfx")
            .join("metadata")
            .join(&self.pipeline_name)
            .join("metadata.db")
    }

    /// Parámetros del pipeline taxi con el layout convencional bajo
    /// `work_dir` y los overrides explícitos.
    pub fn pipeline_params(&self) -> TaxiPipelineParams {
        let mut params = TaxiPipelineParams::new(self.pipeline_name.clone(), &self.data_root, &self.work_dir);
        if let Some(root) = &self.pipeline_root {
            params.pipeline_root = root.clone();
        }
        if let Some(serving) = &self.serving_model_dir {
            params.serving_model_dir = serving.clone();
        }
        params.enable_cache = self.enable_cache;
        params
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}
