use std::path::PathBuf;

use async_trait::async_trait;
use sat_model::State;
use tracing::debug;

use super::StateFetcher;
use crate::errors::StateError;

/// Reads a state document from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileStateFetcher {
    path: PathBuf,
    display: String,
}

impl FileStateFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self { path, display }
    }
}

#[async_trait]
impl StateFetcher for FileStateFetcher {
    fn source(&self) -> &str {
        &self.display
    }

    async fn fetch(&self) -> Result<State, StateError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StateError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.display, bytes = bytes.len(), "state file read");
        Ok(State::from_json(&bytes)?)
    }
}
