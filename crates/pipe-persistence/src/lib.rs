//! pipe-persistence
//!
//! Backend durable (SQLite vía Diesel) del `MetadataStore` de pipe-core y
//! acceso con alcance al backend configurado.
//!
//! Módulos:
//! - `sqlite`: store, pool r2d2 y reintentos.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env / entorno.
//! - `schema`: tablas Diesel declaradas para compilar queries.
//! - `handle`: `open_store` / `with_store`.

pub mod config;
pub mod error;
pub mod handle;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use config::ConnectionConfig;
pub use error::PersistenceError;
pub use handle::{open_store, with_store, MetadataHandle};
pub use sqlite::{build_pool, ConnectionProvider, PoolProvider, SqliteMetadataStore, SqlitePool};
