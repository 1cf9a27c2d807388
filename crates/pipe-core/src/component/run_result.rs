use std::collections::BTreeMap;

use crate::model::{ArtifactDecodeError, ArtifactDraft, ArtifactId, ArtifactSpec, OutputArtifact};

/// Outputs de un componente agrupados por canal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentOutputs {
    pub channels: BTreeMap<String, Vec<OutputArtifact>>,
}

impl ComponentOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(mut self, channel: impl Into<String>, draft: ArtifactDraft) -> Self {
        self.channels.entry(channel.into()).or_default().push(OutputArtifact::Fresh(draft));
        self
    }

    /// Atajo para publicar un artifact tipado.
    pub fn typed<T: ArtifactSpec>(self, channel: impl Into<String>, value: T) -> Result<Self, ArtifactDecodeError> {
        Ok(self.fresh(channel, value.into_draft()?))
    }

    pub fn existing(mut self, channel: impl Into<String>, id: ArtifactId) -> Self {
        self.channels.entry(channel.into()).or_default().push(OutputArtifact::Existing(id));
        self
    }

    /// Declara un canal vacío (p.ej. un resolver sin nada que resolver).
    pub fn empty(mut self, channel: impl Into<String>) -> Self {
        self.channels.entry(channel.into()).or_default();
        self
    }
}

/// Resultado abstracto de ejecutar el body de un componente.
#[derive(Debug)]
pub enum ComponentRunResult {
    Success { outputs: ComponentOutputs },
    Failure { error: String },
}

impl ComponentRunResult {
    pub fn success(outputs: ComponentOutputs) -> Self {
        Self::Success { outputs }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }
}

impl From<Result<ComponentOutputs, String>> for ComponentRunResult {
    fn from(r: Result<ComponentOutputs, String>) -> Self {
        match r {
            Ok(outputs) => Self::Success { outputs },
            Err(error) => Self::Failure { error },
        }
    }
}
