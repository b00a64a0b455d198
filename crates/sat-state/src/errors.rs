use std::path::PathBuf;

use sat_core::TaskError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("http request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("incomplete credentials: missing {0}")]
    IncompleteAuth(String),

    #[error("invalid locator {locator}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("failed to decode state: {0}")]
    Decode(#[from] sat_model::ModelError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("replication failed: {0}")]
    Replication(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("publish failed: {0}")]
    Publish(#[from] sat_core::CoreError),

    #[error("canceled")]
    Canceled,
}

impl From<StateError> for TaskError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::Canceled => TaskError::Canceled,
            other => TaskError::Fail {
                reason: other.to_string(),
            },
        }
    }
}
