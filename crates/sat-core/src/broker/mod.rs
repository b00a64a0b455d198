//! In-process publish/subscribe hub.
//!
//! Every topic owns one bounded `tokio::sync::broadcast` channel:
//! ```text
//! task → EventBroker::publish(Event) → broadcast(topic) → every Subscription of that topic
//! ```
//! Publishing never blocks. A subscriber that falls more than `capacity`
//! events behind loses the oldest ones and logs how many it skipped.

mod event;
pub use event::{Event, Payload, topics};

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace, warn};

use crate::error::CoreError;

#[derive(Clone)]
pub struct EventBroker {
    inner: Arc<Inner>,
}

struct Inner {
    topics: Mutex<HashMap<String, broadcast::Sender<Event>>>,
    capacity: usize,
}

impl EventBroker {
    /// Per-topic buffer size used by [`EventBroker::new`].
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Subscribe to a topic. The subscription is released when dropped.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let mut topics = self
            .inner
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let rx = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .subscribe();

        trace!(topic, "subscribed");
        Subscription {
            topic: topic.to_string(),
            rx,
        }
    }

    /// Deliver an event to every current subscriber of `event.name`.
    ///
    /// Returns how many subscribers received it. An event whose payload does not
    /// belong to its topic is rejected before anything is delivered.
    pub fn publish(&self, event: Event) -> Result<usize, CoreError> {
        event.validate()?;

        let sender = {
            let topics = self
                .inner
                .topics
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            topics.get(&event.name).cloned()
        };
        let Some(sender) = sender else {
            debug!(topic = %event.name, source = %event.source, "no subscribers; event dropped");
            return Ok(0);
        };

        let topic = event.name.clone();
        match sender.send(event) {
            Ok(delivered) => {
                trace!(%topic, delivered, "event published");
                Ok(delivered)
            }
            Err(_) => {
                debug!(%topic, "no subscribers; event dropped");
                Ok(0)
            }
        }
    }

    /// Number of live subscriptions for a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self
            .inner
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        topics.get(topic).map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end for one topic.
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Event>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next event. `None` once the broker is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged; oldest events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged; oldest events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
