//! Modelos neutrales (Artifact, Execution, CacheKey, ExecutionContext, ...)

pub mod artifact;
pub mod cache_key;
pub mod context;
pub mod execution;
pub mod typed_artifact;

pub use artifact::{Artifact, ArtifactDraft, ArtifactId, OutputArtifact};
pub use cache_key::{CacheKey, CachingPolicy};
pub use context::{ExecutionContext, MetadataReader};
pub use execution::{ArtifactEvent, EventKind, Execution, ExecutionId, ExecutionState, PipelineScope};
pub use typed_artifact::{ArtifactDecodeError, ArtifactSpec};
