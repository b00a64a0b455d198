use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("event '{topic}' carries a payload for topic '{expected}'")]
    PayloadMismatch { topic: String, expected: &'static str },

    #[error("scheduler is shut down")]
    SchedulerClosed,

    #[error("config error: {0}")]
    Config(#[from] sat_model::ModelError),
}

/// Outcome of a failed task execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The attempt failed; the task stays scheduled and is retried on its next tick.
    #[error("{reason}")]
    Fail { reason: String },

    #[error("canceled")]
    Canceled,

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl TaskError {
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }
}
