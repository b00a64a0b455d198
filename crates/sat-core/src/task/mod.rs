//! Task capability set and the per-tick execution protocol.
//!
//! ```text
//! Idle ──try_begin──▶ Running ──Continue──▶ Idle
//!                        └────Terminated──▶ Terminated
//! ```
//! A tick that finds the task not Idle is skipped. The precondition check runs
//! while the task is Running; failing it returns the task to Idle.

mod handle;
pub use handle::{Phase, RunGuard, TaskHandle};

use std::sync::Arc;

use async_trait::async_trait;
use sat_model::TaskId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::TaskError;

/// What the task wants after a successful execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Stay scheduled.
    Continue,
    /// Done for good; the scheduler removes the task.
    Terminated,
}

/// A unit of periodic work driven by the [`crate::Scheduler`].
#[async_trait]
pub trait Task: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn cron_expr(&self) -> &str;

    /// Schedule id and lifecycle phase.
    fn handle(&self) -> &TaskHandle;

    /// Check that the task has what it needs to do real work.
    ///
    /// `Err(reason)` skips the tick without treating it as a failure.
    fn can_execute(&self) -> Result<(), String>;

    async fn execute(&self, ctx: &CancellationToken) -> Result<Completion, TaskError>;

    fn id(&self) -> Option<TaskId> {
        self.handle().id()
    }

    fn set_id(&self, id: TaskId) {
        self.handle().set_id(id)
    }

    fn phase(&self) -> Phase {
        self.handle().phase()
    }

    fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }
}

pub type TaskRef = Arc<dyn Task>;

/// Result of one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing ran: the task was busy, terminated, or its precondition failed.
    Skipped(String),
    Completed,
    Terminated,
    Failed(TaskError),
}

/// Run one tick of `task`.
pub async fn trigger(task: &dyn Task, ctx: &CancellationToken) -> Tick {
    let guard = match task.handle().try_begin() {
        Ok(guard) => guard,
        Err(phase) => {
            warn!(task = task.name(), ?phase, "execution skipped: task is not idle");
            return Tick::Skipped(format!("task is {phase:?}"));
        }
    };

    if let Err(reason) = task.can_execute() {
        warn!(task = task.name(), %reason, "task cannot execute");
        return Tick::Skipped(reason);
    }
    if ctx.is_cancelled() {
        return Tick::Failed(TaskError::Canceled);
    }

    info!(task = task.name(), "executing task");
    match task.execute(ctx).await {
        Ok(Completion::Continue) => {
            guard.finish(Completion::Continue);
            debug!(task = task.name(), "execution completed");
            Tick::Completed
        }
        Ok(Completion::Terminated) => {
            guard.finish(Completion::Terminated);
            info!(task = task.name(), "task terminated");
            Tick::Terminated
        }
        Err(e) => {
            guard.finish(Completion::Continue);
            error!(task = task.name(), reason = %e, "execution failed");
            Tick::Failed(e)
        }
    }
}
