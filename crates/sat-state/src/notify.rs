use tracing::info;

use crate::errors::StateError;

/// Told after a state has been reconciled.
pub trait Notifier: Send + Sync {
    fn notify(&self) -> Result<(), StateError>;
}

/// Writes a log line per notification.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self) -> Result<(), StateError> {
        info!("state reconciled");
        Ok(())
    }
}
