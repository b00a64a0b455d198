use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::Client;
use sat_core::{Completion, ConfigStore, Event, EventBroker, Payload, Task, TaskError, TaskHandle, topics};
use sat_model::{State, StateConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{cancellable, http_client};
use crate::{
    Credentials, RECONCILE_TASK,
    diff::diff,
    errors::StateError,
    fetch::{FileStateFetcher, Locator, StateFetcher, UrlStateFetcher, format_registry_url},
    notify::Notifier,
    replicate::Replicator,
};

/// A state locator and the snapshot last reconciled from it.
#[derive(Debug, Clone)]
struct Tracked {
    locator: String,
    last: Option<State>,
}

#[derive(Debug, Default)]
struct Inner {
    credentials: Credentials,
    tracked: Vec<Tracked>,
}

/// Periodically pulls every tracked state, diffs it against the last one and
/// drives the replicator.
///
/// Locators are independent: one failing does not stop the others, and a
/// locator's snapshot only advances once its deletions and replications both
/// succeeded.
pub struct ReconcileTask {
    handle: TaskHandle,
    cron_expr: String,
    store: ConfigStore,
    replicator: Arc<dyn Replicator>,
    notifier: Arc<dyn Notifier>,
    client: Client,
    inner: Mutex<Inner>,
}

impl ReconcileTask {
    pub fn new(
        cron_expr: impl Into<String>,
        store: ConfigStore,
        credentials: Credentials,
        locators: &[String],
        replicator: Arc<dyn Replicator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, StateError> {
        let client = http_client(credentials.use_unsecure)?;
        let mut inner = Inner {
            credentials,
            tracked: Vec::new(),
        };
        retrack(&mut inner.tracked, locators);

        Ok(Self {
            handle: TaskHandle::new(),
            cron_expr: cron_expr.into(),
            store,
            replicator,
            notifier,
            client,
            inner: Mutex::new(inner),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn credentials(&self) -> Credentials {
        self.lock().credentials.clone()
    }

    /// Locators in processing order.
    pub fn locators(&self) -> Vec<String> {
        self.lock().tracked.iter().map(|t| t.locator.clone()).collect()
    }

    /// Snapshot last reconciled from `locator`.
    pub fn last_known(&self, locator: &str) -> Option<State> {
        self.lock()
            .tracked
            .iter()
            .find(|t| t.locator == locator)
            .and_then(|t| t.last.clone())
    }

    /// Take over credentials and locators issued at registration.
    pub fn apply_registration(&self, config: &StateConfig) {
        let mut inner = self.lock();
        inner.credentials.username = config.auth.name.clone();
        inner.credentials.password = config.auth.secret.clone();
        inner.credentials.source_registry = format_registry_url(&config.auth.registry);
        retrack(&mut inner.tracked, &config.states);
        info!(
            task = RECONCILE_TASK,
            source = %inner.credentials.source_registry,
            locators = inner.tracked.len(),
            "credentials updated"
        );
    }

    /// Replace the tracked locator set.
    ///
    /// Locators that stay keep their last snapshot. Dropped locators are
    /// forgotten without touching what was already replicated from them.
    pub fn set_locators(&self, locators: &[String]) {
        let mut inner = self.lock();
        retrack(&mut inner.tracked, locators);
        info!(task = RECONCILE_TASK, locators = inner.tracked.len(), "locators updated");
    }

    /// Follow registration and configuration events until `ctx` is canceled.
    pub fn listen(self: &Arc<Self>, broker: &EventBroker, ctx: CancellationToken) -> JoinHandle<()> {
        let mut registrations = broker.subscribe(topics::REGISTRATION_COMPLETED);
        let mut updates = broker.subscribe(topics::CONFIG_UPDATED);
        let task = Arc::clone(self);

        tokio::spawn(async move {
            debug!(task = RECONCILE_TASK, "listening for configuration events");
            loop {
                let event = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => break,
                    ev = registrations.recv() => ev,
                    ev = updates.recv() => ev,
                };
                let Some(event) = event else { break };
                task.on_event(event);
            }
            debug!(task = RECONCILE_TASK, "configuration listener stopped");
        })
    }

    fn on_event(&self, event: Event) {
        match event.payload {
            Payload::RegistrationCompleted(config) => self.apply_registration(&config),
            Payload::ConfigUpdated(update) if update.states.is_empty() => {
                debug!(task = RECONCILE_TASK, source = %event.source, "empty locator list ignored");
            }
            Payload::ConfigUpdated(update) => self.set_locators(&update.states),
            Payload::StopTask(_) => {}
        }
    }

    fn fetcher(&self, locator: &str, credentials: &Credentials) -> Result<Box<dyn StateFetcher>, StateError> {
        match Locator::parse(locator)? {
            Locator::Url(url) => {
                self.store.set_remote_registry_url(format_registry_url(url.as_str()));
                Ok(Box::new(UrlStateFetcher::new(
                    self.client.clone(),
                    url,
                    &credentials.username,
                    &credentials.password,
                )))
            }
            Locator::File(path) => Ok(Box::new(FileStateFetcher::new(path))),
        }
    }

    async fn reconcile(
        &self,
        ctx: &CancellationToken,
        credentials: &Credentials,
        locator: &str,
        last: Option<&State>,
    ) -> Result<State, StateError> {
        let fetcher = self.fetcher(locator, credentials)?;
        let mut state = cancellable(ctx, fetcher.fetch()).await?;

        state.normalize();
        let untagged = state.retain_tagged();
        if untagged > 0 {
            debug!(task = RECONCILE_TASK, locator, untagged, "untagged artifacts skipped");
        }

        let changes = diff(last, &state);
        info!(
            task = RECONCILE_TASK,
            source = fetcher.source(),
            delete = changes.delete.len(),
            replicate = changes.replicate.len(),
            "changes computed"
        );

        if !changes.delete.is_empty() {
            cancellable(ctx, self.replicator.delete_replication_entity(&changes.delete)).await?;
        }
        if !changes.replicate.is_empty() {
            cancellable(ctx, self.replicator.replicate(&changes.replicate)).await?;
        }
        Ok(state)
    }

    fn commit(&self, locator: &str, state: State) {
        let mut inner = self.lock();
        match inner.tracked.iter_mut().find(|t| t.locator == locator) {
            Some(tracked) => tracked.last = Some(state),
            None => debug!(task = RECONCILE_TASK, locator, "locator dropped during reconciliation"),
        }
    }
}

/// Keep surviving entries in place, append new locators in order.
fn retrack(tracked: &mut Vec<Tracked>, locators: &[String]) {
    tracked.retain(|t| locators.contains(&t.locator));
    for locator in locators {
        if !tracked.iter().any(|t| &t.locator == locator) {
            tracked.push(Tracked {
                locator: locator.clone(),
                last: None,
            });
        }
    }
}

#[async_trait]
impl Task for ReconcileTask {
    fn name(&self) -> &str {
        RECONCILE_TASK
    }

    fn cron_expr(&self) -> &str {
        &self.cron_expr
    }

    fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    fn can_execute(&self) -> Result<(), String> {
        let inner = self.lock();
        let mut missing = Vec::new();
        if inner.tracked.is_empty() {
            missing.push("state locators");
        }
        missing.extend(inner.credentials.missing());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing {}", missing.join(", ")))
        }
    }

    async fn execute(&self, ctx: &CancellationToken) -> Result<Completion, TaskError> {
        let (credentials, work) = {
            let inner = self.lock();
            (inner.credentials.clone(), inner.tracked.clone())
        };

        let total = work.len();
        let mut failed = Vec::new();
        for Tracked { locator, last } in work {
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            debug!(task = RECONCILE_TASK, %locator, "reconciling state");

            match self.reconcile(ctx, &credentials, &locator, last.as_ref()).await {
                Ok(state) => {
                    self.commit(&locator, state);
                    if let Err(e) = self.notifier.notify() {
                        warn!(task = RECONCILE_TASK, %locator, error = %e, "notification failed");
                    }
                }
                Err(StateError::Canceled) => return Err(TaskError::Canceled),
                Err(e) => {
                    error!(task = RECONCILE_TASK, %locator, error = %e, "reconciliation failed");
                    failed.push(format!("{locator}: {e}"));
                }
            }
        }

        if failed.is_empty() {
            Ok(Completion::Continue)
        } else {
            Err(TaskError::fail(format!(
                "{} of {total} locators failed: {}",
                failed.len(),
                failed.join("; ")
            )))
        }
    }
}
