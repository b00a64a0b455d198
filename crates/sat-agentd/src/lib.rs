//! Composition root of the satellite agent.
//!
//! [`Agent::start`] wires the configuration store, the event broker and the
//! scheduler to the three satellite tasks:
//! - zero-touch registration (one-shot bootstrap);
//! - state reconciliation (fetch, diff, replicate);
//! - configuration refresh.

mod error;
pub use error::AgentError;

use std::{path::PathBuf, sync::Arc};

use sat_core::{ConfigStore, EventBroker, Scheduler, SchedulerConfig, TaskRef};
use sat_model::{REGISTER_SATELLITE_JOB, REPLICATE_STATE_JOB, TaskId, UPDATE_CONFIG_JOB, default_cron};
use sat_observe::EventJournal;
use sat_state::{
    ConfigRefreshTask, ConfigSource, Credentials, DryRunReplicator, LogNotifier, Notifier,
    ReconcileTask, RegistrationTask, Replicator, fetch::format_registry_url,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "SATELLITE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Configuration file: first CLI argument, then [`CONFIG_ENV`], then [`DEFAULT_CONFIG_PATH`].
pub fn config_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Everything the agent is built from.
pub struct AgentDeps {
    pub store: ConfigStore,
    pub broker: EventBroker,
    pub replicator: Arc<dyn Replicator>,
    pub notifier: Arc<dyn Notifier>,
    pub config_source: Arc<dyn ConfigSource>,
    pub scheduler: SchedulerConfig,
}

impl AgentDeps {
    /// Defaults: fresh broker, dry-run replication into the local registry, log notifications.
    pub fn new(store: ConfigStore, config_source: Arc<dyn ConfigSource>) -> Self {
        let replicator = Arc::new(DryRunReplicator::new(store.local_registry_url()));
        Self {
            store,
            broker: EventBroker::new(),
            replicator,
            notifier: Arc::new(LogNotifier),
            config_source,
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// A running satellite.
pub struct Agent {
    ctx: CancellationToken,
    broker: EventBroker,
    scheduler: Scheduler,
    reconcile: Arc<ReconcileTask>,
    listeners: Vec<JoinHandle<()>>,
}

fn cron_for(store: &ConfigStore, job: &str) -> String {
    store
        .job_schedule(job)
        .or_else(|| default_cron(job).map(str::to_string))
        .unwrap_or_default()
}

fn credentials(store: &ConfigStore) -> Credentials {
    let auth = store.state_config().auth;
    Credentials {
        username: auth.name,
        password: auth.secret,
        source_registry: format_registry_url(&auth.registry),
        destination: store.local_registry_url(),
        use_unsecure: store.use_unsecure(),
    }
}

impl Agent {
    /// Build the tasks, start the listeners and schedule everything.
    ///
    /// Must be called inside a tokio runtime. If any task fails to schedule,
    /// whatever was already started is torn down again.
    pub fn start(deps: AgentDeps) -> Result<Self, AgentError> {
        let AgentDeps {
            store,
            broker,
            replicator,
            notifier,
            config_source,
            scheduler,
        } = deps;

        let registration = Arc::new(RegistrationTask::new(
            cron_for(&store, REGISTER_SATELLITE_JOB),
            store.clone(),
            broker.clone(),
        )?);
        let reconcile = Arc::new(ReconcileTask::new(
            cron_for(&store, REPLICATE_STATE_JOB),
            store.clone(),
            credentials(&store),
            &store.state_config().states,
            replicator,
            notifier,
        )?);
        let refresh = Arc::new(ConfigRefreshTask::new(
            cron_for(&store, UPDATE_CONFIG_JOB),
            config_source,
            broker.clone(),
        ));

        let ctx = CancellationToken::new();
        let listeners = vec![
            EventJournal::new(&broker).spawn(ctx.clone()),
            reconcile.listen(&broker, ctx.clone()),
        ];
        let scheduler = Scheduler::start(&broker, &ctx, scheduler);

        let tasks: [(&'static str, TaskRef); 3] = [
            (sat_state::REGISTRATION_TASK, registration),
            (sat_state::RECONCILE_TASK, reconcile.clone()),
            (sat_state::CONFIG_REFRESH_TASK, refresh),
        ];
        let mut scheduled: Vec<TaskId> = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            match scheduler.schedule(task) {
                Ok(id) => scheduled.push(id),
                Err(source) => {
                    warn!(task = name, error = %source, "scheduling failed; rolling back");
                    for id in scheduled {
                        scheduler.unschedule(id);
                    }
                    ctx.cancel();
                    return Err(AgentError::Schedule { task: name, source });
                }
            }
        }

        info!(tasks = scheduled.len(), "satellite started");
        Ok(Self {
            ctx,
            broker,
            scheduler,
            reconcile,
            listeners,
        })
    }

    pub fn broker(&self) -> &EventBroker {
        &self.broker
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn reconcile(&self) -> &Arc<ReconcileTask> {
        &self.reconcile
    }

    /// Cancel the run scope, wait for listeners and stop the scheduler.
    pub async fn shutdown(self) {
        self.ctx.cancel();
        for listener in self.listeners {
            if let Err(e) = listener.await {
                warn!(error = %e, "listener did not exit cleanly");
            }
        }
        self.scheduler.shutdown().await;
        info!("satellite stopped");
    }
}
