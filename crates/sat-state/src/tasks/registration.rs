use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sat_core::{Completion, ConfigStore, Event, EventBroker, Payload, Task, TaskError, TaskHandle};
use sat_model::{StateConfig, StopTask};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{cancellable, http_client};
use crate::{REGISTRATION_TASK, ZTR_ROUTE, errors::StateError};

/// One-shot bootstrap: exchange the token for credentials and state locators.
///
/// On success the task publishes the issued config, asks to be unscheduled and
/// returns [`Completion::Terminated`]. On failure it stays scheduled and retries
/// on the next tick.
pub struct RegistrationTask {
    handle: TaskHandle,
    cron_expr: String,
    store: ConfigStore,
    broker: EventBroker,
    client: Client,
}

impl RegistrationTask {
    pub fn new(cron_expr: impl Into<String>, store: ConfigStore, broker: EventBroker) -> Result<Self, StateError> {
        let client = http_client(store.use_unsecure())?;
        Ok(Self {
            handle: TaskHandle::new(),
            cron_expr: cron_expr.into(),
            store,
            broker,
            client,
        })
    }

    /// Events announcing a successful registration, in publish order.
    ///
    /// Subscribers must see the issued config before the stop request.
    fn completion_events(&self, config: StateConfig) -> Vec<Event> {
        let mut events = vec![Event::new(REGISTRATION_TASK, Payload::RegistrationCompleted(config))];
        match self.id() {
            Some(id) => events.push(Event::new(
                REGISTRATION_TASK,
                Payload::StopTask(StopTask {
                    name: REGISTRATION_TASK.to_string(),
                    id,
                }),
            )),
            None => debug!(task = REGISTRATION_TASK, "not scheduled; no stop request needed"),
        }
        events
    }
}

/// `GET {ground_control_url}/satellites/ztr/{token}`.
///
/// Anything but `200 OK` with a complete set of credentials is an error.
pub async fn register_satellite(
    client: &Client,
    ground_control_url: &str,
    token: &str,
) -> Result<StateConfig, StateError> {
    let url = format!("{}/{}/{}", ground_control_url.trim_end_matches('/'), ZTR_ROUTE, token);

    let response = client.get(&url).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(StateError::Rejected(format!("registration returned {status}")));
    }

    let body = response.bytes().await?;
    let config: StateConfig = serde_json::from_slice(&body)
        .map_err(|e| StateError::InvalidResponse(format!("failed to decode registration response: {e}")))?;

    let missing = config.auth.missing();
    if !missing.is_empty() {
        return Err(StateError::IncompleteAuth(missing.join(", ")));
    }
    Ok(config)
}

#[async_trait]
impl Task for RegistrationTask {
    fn name(&self) -> &str {
        REGISTRATION_TASK
    }

    fn cron_expr(&self) -> &str {
        &self.cron_expr
    }

    fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    fn can_execute(&self) -> Result<(), String> {
        let mut missing = Vec::new();
        if self.store.token().is_empty() {
            missing.push("token");
        }
        if self.store.ground_control_url().is_empty() {
            missing.push("ground control URL");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing {}", missing.join(", ")))
        }
    }

    async fn execute(&self, ctx: &CancellationToken) -> Result<Completion, TaskError> {
        let url = self.store.ground_control_url();
        let token = self.store.token();
        debug!(task = REGISTRATION_TASK, ground_control = %url, "registering satellite");

        let config = cancellable(ctx, register_satellite(&self.client, &url, &token)).await?;
        info!(
            task = REGISTRATION_TASK,
            registry = %config.auth.registry,
            states = config.states.len(),
            "satellite registered"
        );

        self.store.update_state_config(config.clone()).await;
        for event in self.completion_events(config) {
            self.broker.publish(event).map_err(StateError::from)?;
        }

        Ok(Completion::Terminated)
    }
}
