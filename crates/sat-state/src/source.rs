use std::path::PathBuf;

use async_trait::async_trait;
use sat_model::{Config, ConfigUpdate};
use tracing::debug;

use crate::errors::StateError;

/// Where the refresh task pulls configuration from.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<ConfigUpdate, StateError>;
}

/// Re-reads the agent's configuration file.
///
/// Picks up locator changes written by registration or by an operator.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn fetch(&self) -> Result<ConfigUpdate, StateError> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StateError::Io {
                path: self.path.clone(),
                source,
            })?;
        let config = Config::from_json(&data)?;
        debug!(
            path = %self.path.display(),
            states = config.state_config.states.len(),
            "configuration read"
        );
        Ok(ConfigUpdate {
            states: config.state_config.states,
        })
    }
}
