use std::path::PathBuf;

use pipe_core::model::ArtifactDecodeError;
use pipe_core::{DefinitionError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("i/o error at {}: {source}", path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("{}:{line}: {message}", path.display())]
    Format { path: PathBuf, line: usize, message: String },
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("invalid module file: {0}")]
    Module(String),
    #[error(transparent)]
    Decode(#[from] ArtifactDecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("{0}")]
    Invalid(String),
}

impl AdapterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
