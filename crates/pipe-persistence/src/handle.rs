//! Acceso con alcance al backend configurado.
//!
//! `open_store` construye el backend; `with_store` lo abre, entrega una
//! referencia al closure y lo libera al terminar (el pool se cierra con el
//! último `Drop`).

use log::info;
use pipe_core::store::{InMemoryMetadataStore, MetadataStore};

use crate::config::ConnectionConfig;
use crate::error::PersistenceError;
use crate::sqlite::{build_pool, PoolProvider, SqliteMetadataStore};

pub enum MetadataHandle {
    Memory(InMemoryMetadataStore),
    Sqlite(SqliteMetadataStore<PoolProvider>),
}

impl MetadataHandle {
    pub fn store(&self) -> &dyn MetadataStore {
        match self {
            MetadataHandle::Memory(s) => s,
            MetadataHandle::Sqlite(s) => s,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MetadataHandle::Memory(_) => "in-memory",
            MetadataHandle::Sqlite(_) => "sqlite",
        }
    }
}

impl Drop for MetadataHandle {
    fn drop(&mut self) {
        info!("metadata store released ({})", self.kind());
    }
}

pub fn open_store(config: &ConnectionConfig) -> Result<MetadataHandle, PersistenceError> {
    info!("opening metadata store {}", config.describe());
    match config {
        ConnectionConfig::InMemory => Ok(MetadataHandle::Memory(InMemoryMetadataStore::new())),
        ConnectionConfig::Sqlite { path,
                                   max_connections,
                                   busy_timeout_ms, } => {
            let pool = build_pool(path, *max_connections, *busy_timeout_ms)?;
            Ok(MetadataHandle::Sqlite(SqliteMetadataStore::new(PoolProvider { pool })))
        }
    }
}

/// Abre el store, ejecuta `f` y lo libera aunque `f` devuelva error.
pub fn with_store<T>(config: &ConnectionConfig, f: impl FnOnce(&dyn MetadataStore) -> T) -> Result<T, PersistenceError> {
    let handle = open_store(config)?;
    Ok(f(handle.store()))
}
