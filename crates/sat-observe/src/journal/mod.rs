mod view;
pub use view::{log_event, message_for};

use sat_core::{EventBroker, Subscription, topics};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Logs every event published on the well-known topics.
pub struct EventJournal {
    registrations: Subscription,
    updates: Subscription,
    stops: Subscription,
}

impl EventJournal {
    /// Subscribes immediately; events published before [`EventJournal::spawn`] are kept.
    pub fn new(broker: &EventBroker) -> Self {
        Self {
            registrations: broker.subscribe(topics::REGISTRATION_COMPLETED),
            updates: broker.subscribe(topics::CONFIG_UPDATED),
            stops: broker.subscribe(topics::STOP_TASK),
        }
    }

    pub fn spawn(mut self, ctx: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => break,
                    ev = self.registrations.recv() => ev,
                    ev = self.updates.recv() => ev,
                    ev = self.stops.recv() => ev,
                };
                match event {
                    Some(event) => log_event(&event),
                    None => break,
                }
            }
            debug!("event journal stopped");
        })
    }
}
