use serde::{Deserialize, Serialize};

use super::{Artifact, null_as_empty};
use crate::ModelError;

/// Desired replication set published by one state source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub registry: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub artifacts: Vec<Artifact>,
}

impl State {
    pub fn new(registry: impl Into<String>, artifacts: Vec<Artifact>) -> Self {
        Self {
            registry: registry.into(),
            artifacts,
        }
    }

    /// Decode a state document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    #[inline]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Normalize repository/name of every artifact in place.
    pub fn normalize(&mut self) {
        self.artifacts.iter_mut().for_each(Artifact::normalize);
    }

    /// Drop artifacts without tags. Returns how many were removed.
    pub fn retain_tagged(&mut self) -> usize {
        let before = self.artifacts.len();
        self.artifacts.retain(Artifact::is_tagged);
        before - self.artifacts.len()
    }
}
