//! Archivo de módulo del usuario (features y label del modelo).
//!
//! Es un JSON: `{ "label_key", "numeric_features", "categorical_features",
//! "train_steps" }`. Su fingerprint entra en la configuración de Transform y
//! Trainer, de modo que editarlo invalida la cache de ambos.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub label_key: String,
    pub numeric_features: Vec<String>,
    #[serde(default)]
    pub categorical_features: Vec<String>,
    #[serde(default = "default_train_steps")]
    pub train_steps: u64,
}

fn default_train_steps() -> u64 {
    1
}

impl ModuleSpec {
    pub fn load(path: &Path) -> Result<Self, AdapterError> {
        let text = fs::read_to_string(path).map_err(|e| AdapterError::io(path, e))?;
        let spec: ModuleSpec =
            serde_json::from_str(&text).map_err(|e| AdapterError::Module(format!("{}: {e}", path.display())))?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), AdapterError> {
        if self.label_key.is_empty() {
            return Err(AdapterError::Module("label_key must not be empty".into()));
        }
        if self.numeric_features.is_empty() {
            return Err(AdapterError::Module("at least one numeric feature is required".into()));
        }
        if self.numeric_features.contains(&self.label_key) || self.categorical_features.contains(&self.label_key) {
            return Err(AdapterError::Module(format!("label '{}' listed as a feature", self.label_key)));
        }
        Ok(())
    }

    /// Features + label: columnas que Transform debe encontrar en el schema.
    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        self.numeric_features
            .iter()
            .chain(self.categorical_features.iter())
            .map(String::as_str)
            .chain(std::iter::once(self.label_key.as_str()))
    }
}
