//! Pusher: copia el modelo bendecido a `<serving_model_dir>/<execution_id>/`.

use std::fs;
use std::path::Path;

use log::info;
use pipe_core::model::ArtifactSpec;
use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};
use walkdir::WalkDir;

use super::{finish, single_input};
use crate::artifacts::{BlessingArtifact, ModelArtifact, PushedModelArtifact, SERVING_MODEL_DIR};
use crate::error::AdapterError;

#[derive(Debug, Default)]
pub struct Pusher;

pub(crate) fn copy_tree(from: &Path, to: &Path) -> Result<usize, AdapterError> {
    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| AdapterError::io(from, e.into()))?;
        let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| AdapterError::io(&target, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(|e| AdapterError::io(&target, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

impl Pusher {
    fn push(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let model = single_input(ctx, "model")?;
        ModelArtifact::from_artifact(model)?;
        let blessing = BlessingArtifact::from_artifact(single_input(ctx, "blessing")?)?;

        let pushed = if blessing.blessed {
            let serving_dir = ctx.config_str("serving_model_dir")
                                 .ok_or_else(|| AdapterError::Invalid("missing 'serving_model_dir' config".into()))?;
            let destination = Path::new(serving_dir).join(ctx.execution_id.to_string());
            let files = copy_tree(&Path::new(&model.uri).join(SERVING_MODEL_DIR), &destination)?;
            info!("Pusher: model {} -> {} ({files} files)", model.id, destination.display());
            PushedModelArtifact { pushed: true,
                                  destination: Some(destination.to_string_lossy().into_owned()),
                                  schema_version: 1 }
        } else {
            info!("Pusher: model {} not blessed, nothing pushed", model.id);
            PushedModelArtifact { pushed: false,
                                  destination: None,
                                  schema_version: 1 }
        };
        Ok(ComponentOutputs::new().typed("pushed_model", pushed)?)
    }
}

impl Component for Pusher {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::push(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_tree_keeps_relative_layout() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("variables")).unwrap();
        fs::write(src.path().join("model.json"), "{}").unwrap();
        fs::write(src.path().join("variables/v.bin"), "1").unwrap();
        let n = copy_tree(src.path(), &dst.path().join("7")).unwrap();
        assert_eq!(n, 2);
        assert!(dst.path().join("7/variables/v.bin").is_file());
    }
}
