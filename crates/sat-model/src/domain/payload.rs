use serde::{Deserialize, Serialize};

use crate::TaskId;

/// Configuration pulled by the refresh task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// State locators the satellite should track.
    #[serde(default)]
    pub states: Vec<String>,
}

/// Request to remove a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTask {
    pub name: String,
    pub id: TaskId,
}
