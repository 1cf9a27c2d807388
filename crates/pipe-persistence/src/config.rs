//! Configuración del backend de metadata desde variables de entorno.
//!
//! - `PIPEFLOW_METADATA_PATH`: archivo SQLite, o `:memory:` para el store
//!   en memoria. Sin definir, quien llama decide el default.
//! - `PIPEFLOW_METADATA_MAX_CONNECTIONS`: tamaño del pool (default 4).
//! - `PIPEFLOW_METADATA_BUSY_TIMEOUT_MS`: espera ante locks de SQLite
//!   (default 5000).

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

static DOTENV: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

/// Valor de `PIPEFLOW_METADATA_PATH` que selecciona el store en memoria.
pub const IN_MEMORY_PATH: &str = ":memory:";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    InMemory,
    Sqlite { path: PathBuf, max_connections: u32, busy_timeout_ms: u64 },
}

impl ConnectionConfig {
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::Sqlite { path: path.into(),
                       max_connections: DEFAULT_MAX_CONNECTIONS,
                       busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS }
    }

    /// Ruta explícita a backend: `:memory:` es el store en memoria, el
    /// resto un archivo SQLite con los defaults del pool.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.as_os_str() == IN_MEMORY_PATH {
            Self::InMemory
        } else {
            Self::sqlite(path)
        }
    }

    /// `None` si `PIPEFLOW_METADATA_PATH` no está definida (o está vacía).
    pub fn from_env() -> Option<Self> {
        Lazy::force(&DOTENV);
        let path = env::var("PIPEFLOW_METADATA_PATH").ok()
                                                     .filter(|p| !p.trim().is_empty())?;
        match Self::from_path(path) {
            Self::Sqlite { path, .. } => {
                let max_connections = env_number("PIPEFLOW_METADATA_MAX_CONNECTIONS").unwrap_or(DEFAULT_MAX_CONNECTIONS);
                let busy_timeout_ms = env_number("PIPEFLOW_METADATA_BUSY_TIMEOUT_MS").unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
                Some(Self::Sqlite { path,
                                    max_connections,
                                    busy_timeout_ms })
            }
            memory => Some(memory),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::InMemory => "in-memory".to_string(),
            Self::Sqlite { path, .. } => format!("sqlite:{}", path.display()),
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_path_is_an_explicit_opt_in() {
        assert_eq!(ConnectionConfig::from_path(IN_MEMORY_PATH), ConnectionConfig::InMemory);
        assert_eq!(ConnectionConfig::from_path("out/metadata.db"),
                   ConnectionConfig::sqlite("out/metadata.db"));
    }
}
