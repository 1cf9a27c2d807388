//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas y de ahí a
//! `StoreError` del core.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use pipe_core::model::{ArtifactId, ExecutionId};
use pipe_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("execution {0} not found")]
    ExecutionNotFound(ExecutionId),
    #[error("artifact {0} not found")]
    ArtifactNotFound(ArtifactId),
    #[error("execution {id} is '{state}', expected 'running'")]
    InvalidTransition { id: ExecutionId, state: String },
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database busy (retryable): {0}")]
    Busy(String),
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::Busy(info.message().to_string()),
                other => {
                    let msg = info.message().to_string();
                    if is_busy_message(&msg) {
                        Self::Busy(msg)
                    } else {
                        Self::Unknown(format!("db error kind {other:?}: {msg}"))
                    }
                }
            },
            DieselError::DeserializationError(e) => Self::Corrupt(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::AlreadyInTransaction => Self::Unknown("already in transaction".into()),
            DieselError::RollbackErrorOnCommit { rollback_error, commit_error } => {
                Self::Unknown(format!("rollback={rollback_error}; commit={commit_error}"))
            }
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            DieselError::RollbackTransaction => Self::Unknown("rollback transaction".into()),
            DieselError::NotInTransaction => Self::Unknown("not in transaction".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

pub(crate) fn is_busy_message(msg: &str) -> bool {
    let m = msg.to_lowercase();
    m.contains("database is locked") || m.contains("database is busy") || m.contains("sqlite_busy")
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::ExecutionNotFound(id) => StoreError::ExecutionNotFound(id),
            PersistenceError::ArtifactNotFound(id) => StoreError::ArtifactNotFound(id),
            PersistenceError::InvalidTransition { id, state } => StoreError::InvalidTransition { id, state },
            PersistenceError::Corrupt(msg) => StoreError::Corrupt(msg),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
