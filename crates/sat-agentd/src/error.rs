use sat_core::CoreError;
use sat_state::StateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("failed to build task: {0}")]
    Build(#[from] StateError),

    #[error("failed to schedule {task}: {source}")]
    Schedule {
        task: &'static str,
        #[source]
        source: CoreError,
    },
}
