//! Layout en disco bajo el `pipeline_root`.
//!
//! ```text
//! <root>/<component>/<channel>/<execution_id>/[<i>/]payload.json
//! <root>/<component>/.system/executions/<execution_id>/execution.json
//! ```
//!
//! Los directorios de canal sólo existen para ejecuciones frescas; el
//! directorio de sistema existe para toda ejecución registrada.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::component::OutputChannel;
use crate::constants::{EXECUTIONS_DIR, EXECUTION_RECORD_FILE, PAYLOAD_FILE, SYSTEM_DIR};
use crate::errors::EngineError;
use crate::model::{Execution, ExecutionId};

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn execution_dir(&self, component: &str, id: ExecutionId) -> PathBuf {
        self.root
            .join(component)
            .join(SYSTEM_DIR)
            .join(EXECUTIONS_DIR)
            .join(id.to_string())
    }

    pub fn channel_dir(&self, component: &str, channel: &str, id: ExecutionId) -> PathBuf {
        self.root.join(component).join(channel).join(id.to_string())
    }

    pub fn create_execution_dir(&self, component: &str, id: ExecutionId) -> Result<PathBuf, EngineError> {
        let dir = self.execution_dir(component, id);
        fs::create_dir_all(&dir).map_err(|e| EngineError::io(&dir, e))?;
        Ok(dir)
    }

    /// Crea un directorio por canal declarado.
    pub fn prepare_output_dirs(&self,
                               component: &str,
                               outputs: &[OutputChannel],
                               id: ExecutionId)
                               -> Result<BTreeMap<String, PathBuf>, EngineError> {
        let mut dirs = BTreeMap::new();
        for out in outputs {
            let dir = self.channel_dir(component, &out.name, id);
            fs::create_dir_all(&dir).map_err(|e| EngineError::io(&dir, e))?;
            dirs.insert(out.name.clone(), dir);
        }
        Ok(dirs)
    }

    /// Uri del artifact `index` de un canal con `count` artifacts: el propio
    /// directorio del canal si es único, un subdirectorio numerado si no.
    pub fn artifact_dir(channel_dir: &Path, index: usize, count: usize) -> PathBuf {
        if count > 1 {
            channel_dir.join(index.to_string())
        } else {
            channel_dir.to_path_buf()
        }
    }

    pub fn write_payload(dir: &Path, payload: &Value) -> Result<(), EngineError> {
        fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;
        let path = dir.join(PAYLOAD_FILE);
        let bytes = serde_json::to_vec_pretty(payload).map_err(|e| EngineError::Internal(e.to_string()))?;
        fs::write(&path, bytes).map_err(|e| EngineError::io(&path, e))
    }

    pub fn write_execution_record(dir: &Path, execution: &Execution) -> Result<(), EngineError> {
        let path = dir.join(EXECUTION_RECORD_FILE);
        let bytes = serde_json::to_vec_pretty(execution).map_err(|e| EngineError::Internal(e.to_string()))?;
        fs::write(&path, bytes).map_err(|e| EngineError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_follow_component_channel_execution() {
        let layout = OutputLayout::new("/tmp/root");
        assert_eq!(layout.channel_dir("Trainer", "model", ExecutionId(7)),
                   PathBuf::from("/tmp/root/Trainer/model/7"));
        assert_eq!(layout.execution_dir("Trainer", ExecutionId(7)),
                   PathBuf::from("/tmp/root/Trainer/.system/executions/7"));
    }

    #[test]
    fn multi_artifact_channels_get_numbered_subdirs() {
        let base = Path::new("/r/c/out/3");
        assert_eq!(OutputLayout::artifact_dir(base, 0, 1), PathBuf::from("/r/c/out/3"));
        assert_eq!(OutputLayout::artifact_dir(base, 1, 2), PathBuf::from("/r/c/out/3/1"));
    }
}
