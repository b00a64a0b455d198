use std::sync::{Mutex, MutexGuard, PoisonError};

use sat_model::TaskId;

use super::Completion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Terminated,
}

/// Schedule id and lifecycle phase of a task, guarded by one lock.
#[derive(Debug, Default)]
pub struct TaskHandle {
    inner: Mutex<HandleInner>,
}

#[derive(Debug, Default)]
struct HandleInner {
    phase: Phase,
    id: Option<TaskId>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<TaskId> {
        self.lock().id
    }

    pub fn set_id(&self, id: TaskId) {
        self.lock().id = Some(id);
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Move Idle → Running. Returns the current phase when the task is not Idle.
    pub fn try_begin(&self) -> Result<RunGuard<'_>, Phase> {
        let mut inner = self.lock();
        match inner.phase {
            Phase::Idle => {
                inner.phase = Phase::Running;
                Ok(RunGuard {
                    handle: self,
                    finished: false,
                })
            }
            phase => Err(phase),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HandleInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the task is Running. Dropping it unfinished returns the task to Idle.
#[must_use]
pub struct RunGuard<'a> {
    handle: &'a TaskHandle,
    finished: bool,
}

impl RunGuard<'_> {
    pub fn finish(mut self, completion: Completion) {
        self.release(completion);
    }

    fn release(&mut self, completion: Completion) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.handle.lock().phase = match completion {
            Completion::Continue => Phase::Idle,
            Completion::Terminated => Phase::Terminated,
        };
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.release(Completion::Continue);
    }
}
