use sat_core::{Event, Payload};
use tracing::{debug, info};

#[inline]
pub fn message_for(payload: &Payload) -> &'static str {
    match payload {
        Payload::RegistrationCompleted(_) => "satellite registered with ground control",
        Payload::ConfigUpdated(_) => "configuration update received",
        Payload::StopTask(_) => "request to stop a task",
    }
}

#[inline]
pub fn log_event(e: &Event) {
    let msg = message_for(&e.payload);

    match &e.payload {
        Payload::RegistrationCompleted(cfg) => info!(
            topic = %e.name,
            source = %e.source,
            registry = %cfg.auth.registry,
            states = cfg.states.len(),
            "{msg}"
        ),
        Payload::ConfigUpdated(update) => info!(
            topic = %e.name,
            source = %e.source,
            states = update.states.len(),
            "{msg}"
        ),
        Payload::StopTask(stop) => debug!(
            topic = %e.name,
            source = %e.source,
            task = %stop.name,
            id = %stop.id,
            "{msg}"
        ),
    }
}
