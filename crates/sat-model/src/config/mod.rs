//! On-disk agent configuration.
//!
//! The file is JSON:
//! ```json
//! {
//!   "state_config": { "auth": { "name": "", "registry": "", "secret": "" }, "states": [] },
//!   "environment_variables": {
//!     "ground_control_url": "https://gc.example.com",
//!     "token": "...",
//!     "jobs": [ { "name": "replicate_state", "cron_expression": "@every 00h00m30s" } ]
//!   },
//!   "zot_url": "127.0.0.1:8585"
//! }
//! ```
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{ModelError, StateConfig};

pub const REPLICATE_STATE_JOB: &str = "replicate_state";
pub const UPDATE_CONFIG_JOB: &str = "update_config";
pub const REGISTER_SATELLITE_JOB: &str = "register_satellite";

pub const DEFAULT_STATE_REPLICATION_CRON: &str = "@every 00h00m30s";
pub const DEFAULT_CONFIG_UPDATE_CRON: &str = "@every 00h00m10s";
pub const DEFAULT_REGISTRATION_CRON: &str = "@every 00h00m05s";

/// Fallback cron expression for a well-known job.
pub fn default_cron(job: &str) -> Option<&'static str> {
    match job {
        REPLICATE_STATE_JOB => Some(DEFAULT_STATE_REPLICATION_CRON),
        UPDATE_CONFIG_JOB => Some(DEFAULT_CONFIG_UPDATE_CRON),
        REGISTER_SATELLITE_JOB => Some(DEFAULT_REGISTRATION_CRON),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub cron_expression: String,
}

/// Settings supplied by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub bring_own_registry: bool,
    pub ground_control_url: String,
    pub log_level: String,
    pub own_registry_addr: String,
    pub own_registry_port: String,
    pub use_unsecure: bool,
    pub zot_config_path: String,
    pub token: String,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub state_config: StateConfig,
    #[serde(rename = "environment_variables")]
    pub local: LocalConfig,
    pub zot_url: String,
}

impl Config {
    pub fn from_json(data: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !meta.is_file() {
            return Err(ModelError::NotAFile(path.to_path_buf()));
        }
        let data = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.local.jobs.iter().find(|j| j.name == name)
    }

    pub fn log_level(&self) -> &str {
        if self.local.log_level.is_empty() {
            "info"
        } else {
            &self.local.log_level
        }
    }
}
