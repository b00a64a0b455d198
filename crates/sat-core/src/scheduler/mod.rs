//! Cron-driven scheduler.
//!
//! Every scheduled task gets a tick loop. On each tick the loop spawns a fresh
//! tokio task that runs [`crate::task::trigger`], then immediately computes the
//! next tick without waiting for the previous one to finish; overlap is refused
//! by the task's own [`crate::TaskHandle`].
//!
//! A task leaves the scheduler in two ways, both idempotent:
//! - its execution reports [`crate::Completion::Terminated`];
//! - someone publishes a [`crate::Payload::StopTask`] event with its id.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use sat_model::TaskId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    broker::{EventBroker, Payload, Subscription, topics},
    error::{CoreError, TaskError},
    schedule::CronSchedule,
    task::{self, TaskRef, Tick},
};

#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Deadline for a single execution. `None` lets executions run until they finish.
    pub execution_timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Mutex<HashMap<TaskId, Entry>>,
    next_id: AtomicU64,
    ctx: CancellationToken,
    config: SchedulerConfig,
}

struct Entry {
    name: String,
    stop: CancellationToken,
    join: JoinHandle<()>,
}

impl Scheduler {
    /// Create the scheduler and start listening for stop requests on `broker`.
    ///
    /// Must be called inside a tokio runtime. Cancelling `ctx` stops every tick
    /// loop and cancels in-flight executions.
    pub fn start(broker: &EventBroker, ctx: &CancellationToken, config: SchedulerConfig) -> Self {
        let inner = Arc::new(Inner {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            ctx: ctx.child_token(),
            config,
        });

        let stops = broker.subscribe(topics::STOP_TASK);
        tokio::spawn(stop_listener(
            Arc::downgrade(&inner),
            stops,
            inner.ctx.clone(),
        ));

        Self { inner }
    }

    /// Validate the task's cron expression and register it for periodic triggering.
    ///
    /// The assigned id is stored on the task and returned.
    pub fn schedule(&self, task: TaskRef) -> Result<TaskId, CoreError> {
        if self.inner.ctx.is_cancelled() {
            return Err(CoreError::SchedulerClosed);
        }
        let schedule = CronSchedule::parse(task.cron_expr())?;

        let id = TaskId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        task.set_id(id);

        let stop = self.inner.ctx.child_token();
        let name = task.name().to_string();

        // Held across spawn so a fast terminating tick cannot unschedule before insert.
        let mut entries = self.inner.lock();
        let join = tokio::spawn(tick_loop(
            Arc::downgrade(&self.inner),
            id,
            task,
            schedule,
            stop.clone(),
            self.inner.ctx.clone(),
            self.inner.config.execution_timeout,
        ));
        entries.insert(
            id,
            Entry {
                name: name.clone(),
                stop,
                join,
            },
        );
        drop(entries);

        info!(task = %name, %id, "task scheduled");
        Ok(id)
    }

    /// Remove a task. Returns `false` if it was not scheduled (already removed included).
    pub fn unschedule(&self, id: TaskId) -> bool {
        self.inner.unschedule(id)
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.inner.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids and names of every scheduled task, ordered by id.
    pub fn scheduled(&self) -> Vec<(TaskId, String)> {
        let mut out: Vec<_> = self
            .inner
            .lock()
            .iter()
            .map(|(id, e)| (*id, e.name.clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Stop every tick loop and wait for them to exit.
    pub async fn shutdown(&self) {
        self.inner.ctx.cancel();
        let entries: Vec<Entry> = self.inner.lock().drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.stop.cancel();
            if let Err(e) = entry.join.await {
                warn!(task = %entry.name, error = %e, "tick loop did not exit cleanly");
            }
        }
        info!("scheduler stopped");
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unschedule(&self, id: TaskId) -> bool {
        let removed = self.lock().remove(&id);
        match removed {
            Some(entry) => {
                entry.stop.cancel();
                info!(task = %entry.name, %id, "task unscheduled");
                true
            }
            None => {
                debug!(%id, "unschedule ignored: task is not scheduled");
                false
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let entries = self.entries.get_mut().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.values() {
            entry.stop.cancel();
        }
    }
}

async fn tick_loop(
    inner: Weak<Inner>,
    id: TaskId,
    task: TaskRef,
    schedule: CronSchedule,
    stop: CancellationToken,
    exec_ctx: CancellationToken,
    timeout: Option<Duration>,
) {
    loop {
        let Some(delay) = schedule.next_delay(Utc::now()) else {
            warn!(task = task.name(), %id, "schedule has no upcoming trigger");
            break;
        };

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        if stop.is_cancelled() {
            break;
        }

        trace!(task = task.name(), %id, "tick");
        let task = Arc::clone(&task);
        let ctx = exec_ctx.clone();
        let inner = inner.clone();
        tokio::spawn(async move {
            if run_tick(task, &ctx, timeout).await == Tick::Terminated
                && let Some(inner) = inner.upgrade()
            {
                inner.unschedule(id);
            }
        });
    }
    trace!(task = task.name(), %id, "tick loop stopped");
}

async fn run_tick(task: TaskRef, ctx: &CancellationToken, timeout: Option<Duration>) -> Tick {
    let Some(limit) = timeout else {
        return task::trigger(task.as_ref(), ctx).await;
    };
    match tokio::time::timeout(limit, task::trigger(task.as_ref(), ctx)).await {
        Ok(tick) => tick,
        Err(_) => {
            let err = TaskError::Timeout {
                timeout_ms: limit.as_millis() as u64,
            };
            error!(task = task.name(), reason = %err, "execution aborted");
            Tick::Failed(err)
        }
    }
}

async fn stop_listener(inner: Weak<Inner>, mut stops: Subscription, ctx: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = ctx.cancelled() => break,
            event = stops.recv() => event,
        };
        let Some(event) = event else { break };
        let Payload::StopTask(stop) = event.payload else {
            continue;
        };
        let Some(inner) = inner.upgrade() else { break };

        debug!(task = %stop.name, id = %stop.id, source = %event.source, "stop requested");
        inner.unschedule(stop.id);
    }
    trace!("stop listener exited");
}
