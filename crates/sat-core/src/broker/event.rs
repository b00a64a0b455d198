use sat_model::{ConfigUpdate, StateConfig, StopTask};

use crate::error::CoreError;

/// Well-known topic names.
pub mod topics {
    /// Bootstrap registration finished; carries the issued [`sat_model::StateConfig`].
    pub const REGISTRATION_COMPLETED: &str = "zero-touch-registration-event";
    /// Configuration pulled from the control plane changed.
    pub const CONFIG_UPDATED: &str = "fetch-config-from-ground-control-event";
    /// A task asks to be removed from the scheduler.
    pub const STOP_TASK: &str = "stop-process-event";
}

/// Event payload. Each variant belongs to exactly one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    RegistrationCompleted(StateConfig),
    ConfigUpdated(ConfigUpdate),
    StopTask(StopTask),
}

impl Payload {
    /// Topic this payload shape belongs to.
    pub fn topic(&self) -> &'static str {
        match self {
            Payload::RegistrationCompleted(_) => topics::REGISTRATION_COMPLETED,
            Payload::ConfigUpdated(_) => topics::CONFIG_UPDATED,
            Payload::StopTask(_) => topics::STOP_TASK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Topic name.
    pub name: String,
    /// Name of the publishing task.
    pub source: String,
    pub payload: Payload,
}

impl Event {
    /// Build an event on the topic its payload belongs to.
    pub fn new(source: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: payload.topic().to_string(),
            source: source.into(),
            payload,
        }
    }

    /// Build an event on an explicit topic. Checked by [`crate::EventBroker::publish`].
    pub fn with_name(name: impl Into<String>, source: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            payload,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        let expected = self.payload.topic();
        if self.name != expected {
            return Err(CoreError::PayloadMismatch {
                topic: self.name.clone(),
                expected,
            });
        }
        Ok(())
    }
}
