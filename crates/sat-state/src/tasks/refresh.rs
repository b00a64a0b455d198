use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sat_core::{Completion, Event, EventBroker, Payload, Task, TaskError, TaskHandle};
use sat_model::ConfigUpdate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::cancellable;
use crate::{CONFIG_REFRESH_TASK, errors::StateError, source::ConfigSource};

/// Pulls configuration and announces it when it changed.
pub struct ConfigRefreshTask {
    handle: TaskHandle,
    cron_expr: String,
    source: Arc<dyn ConfigSource>,
    broker: EventBroker,
    last: Mutex<Option<ConfigUpdate>>,
}

impl ConfigRefreshTask {
    pub fn new(cron_expr: impl Into<String>, source: Arc<dyn ConfigSource>, broker: EventBroker) -> Self {
        Self {
            handle: TaskHandle::new(),
            cron_expr: cron_expr.into(),
            source,
            broker,
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Task for ConfigRefreshTask {
    fn name(&self) -> &str {
        CONFIG_REFRESH_TASK
    }

    fn cron_expr(&self) -> &str {
        &self.cron_expr
    }

    fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    fn can_execute(&self) -> Result<(), String> {
        Ok(())
    }

    async fn execute(&self, ctx: &CancellationToken) -> Result<Completion, TaskError> {
        let update = cancellable(ctx, self.source.fetch()).await?;

        {
            let last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            if last.as_ref() == Some(&update) {
                debug!(task = CONFIG_REFRESH_TASK, "configuration unchanged");
                return Ok(Completion::Continue);
            }
        }

        let receivers = self
            .broker
            .publish(Event::new(CONFIG_REFRESH_TASK, Payload::ConfigUpdated(update.clone())))
            .map_err(StateError::from)?;
        info!(
            task = CONFIG_REFRESH_TASK,
            states = update.states.len(),
            receivers,
            "configuration update published"
        );

        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(update);
        Ok(Completion::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_core::{Tick, task::trigger, topics};

    struct Fixed(Mutex<Result<Vec<String>, String>>);

    impl Fixed {
        fn set(&self, value: Result<Vec<String>, String>) {
            *self.0.lock().unwrap() = value;
        }
    }

    #[async_trait]
    impl ConfigSource for Fixed {
        async fn fetch(&self) -> Result<ConfigUpdate, StateError> {
            match &*self.0.lock().unwrap() {
                Ok(states) => Ok(ConfigUpdate { states: states.clone() }),
                Err(reason) => Err(StateError::InvalidResponse(reason.clone())),
            }
        }
    }

    fn setup(states: &[&str]) -> (Arc<Fixed>, EventBroker, ConfigRefreshTask) {
        let source = Arc::new(Fixed(Mutex::new(Ok(states.iter().map(|s| s.to_string()).collect()))));
        let broker = EventBroker::new();
        let task = ConfigRefreshTask::new("@every 10s", source.clone(), broker.clone());
        (source, broker, task)
    }

    #[tokio::test]
    async fn publishes_only_changes() {
        let (source, broker, task) = setup(&["/srv/state-a.json"]);
        let mut updates = broker.subscribe(topics::CONFIG_UPDATED);
        let ctx = CancellationToken::new();

        assert_eq!(trigger(&task, &ctx).await, Tick::Completed);
        let event = updates.try_recv().expect("first update");
        assert_eq!(event.source, CONFIG_REFRESH_TASK);
        assert_eq!(
            event.payload,
            Payload::ConfigUpdated(ConfigUpdate { states: vec!["/srv/state-a.json".into()] })
        );

        assert_eq!(trigger(&task, &ctx).await, Tick::Completed);
        assert!(updates.try_recv().is_none());

        source.set(Ok(vec!["/srv/state-b.json".into()]));
        trigger(&task, &ctx).await;
        assert!(updates.try_recv().is_some());
    }

    #[tokio::test]
    async fn source_failure_fails_the_tick() {
        let (source, broker, task) = setup(&[]);
        let mut updates = broker.subscribe(topics::CONFIG_UPDATED);
        source.set(Err("unreachable".into()));

        let tick = trigger(&task, &CancellationToken::new()).await;
        assert!(matches!(tick, Tick::Failed(TaskError::Fail { reason }) if reason.contains("unreachable")));
        assert!(updates.try_recv().is_none());
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let (_source, _broker, task) = setup(&["/srv/state-a.json"]);
        assert_eq!(task.execute(&CancellationToken::new()).await, Ok(Completion::Continue));
    }
}
