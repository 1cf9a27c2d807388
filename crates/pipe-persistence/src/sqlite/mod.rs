//! Implementación SQLite (Diesel) del `MetadataStore` del core.
//!
//! - Pool r2d2 con un customizer que fija `busy_timeout`, claves foráneas y
//!   WAL en cada conexión.
//! - Toda operación que escribe corre en `BEGIN IMMEDIATE`: dos procesos que
//!   comparten el archivo se serializan en el lock de escritura de SQLite.
//! - Reintento corto ante `database is locked` (ver `with_retry`).
//! - Paridad 1:1 con `InMemoryMetadataStore`.

mod rows;
mod store;

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

pub use store::SqliteMetadataStore;

/// Alias de tipo para el pool r2d2 de conexiones SQLite.
pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type SqlitePooledConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o un doble en tests sin acoplar el store a
/// r2d2. Debe devolver una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<SqlitePooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `SqlitePool`.
pub struct PoolProvider {
    pub pool: SqlitePool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<SqlitePooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

#[derive(Debug)]
struct SqlitePragmas {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!("PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; \
                                     PRAGMA synchronous = NORMAL;",
                                    self.busy_timeout_ms))
            .map_err(r2d2::Error::QueryError)
    }
}

/// Construye un pool sobre el archivo `path` (se crea si no existe) y corre
/// las migraciones pendientes.
pub fn build_pool(path: &Path, max_size: u32, busy_timeout_ms: u64) -> Result<SqlitePool, PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PersistenceError::TransientIo(format!("create {}: {e}",
                                                                                           parent.display())))?;
    }
    let validated_max = if max_size == 0 {
        warn!("max_size=0, usando 1");
        1
    } else {
        max_size
    };
    let manager = ConnectionManager::<SqliteConnection>::new(path.to_string_lossy());
    let pool = r2d2::Pool::builder().max_size(validated_max)
                                    .connection_customizer(Box::new(SqlitePragmas { busy_timeout_ms }))
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        let applied = with_retry(|| run_pending_migrations(&mut conn))?;
        debug!("build_pool: {} migrations applied at {}", applied, path.display());
    }
    Ok(pool)
}

/// Determina si un error es transitorio.
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::Busy(_) | PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => crate::error::is_busy_message(msg),
        _ => false,
    }
}

/// Retry simple con backoff lineal (hasta 3 reintentos: 15ms, 30ms, 45ms).
///
/// Sólo repite la unidad de trabajo provista por `f`; cada intento debe ser
/// una transacción completa.
pub(crate) fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_gives_up_after_three_attempts() {
        let mut calls = 0;
        let r: Result<(), _> = with_retry(|| {
            calls += 1;
            Err(PersistenceError::Busy("database is locked".into()))
        });
        assert!(r.is_err());
        assert_eq!(calls, 4);
    }

    #[test]
    fn non_retryable_errors_fail_fast() {
        let mut calls = 0;
        let r: Result<(), _> = with_retry(|| {
            calls += 1;
            Err(PersistenceError::NotFound)
        });
        assert!(r.is_err());
        assert_eq!(calls, 1);
    }
}
