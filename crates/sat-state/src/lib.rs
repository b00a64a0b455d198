mod config;
pub use config::*;

mod errors;
pub use errors::StateError;

pub mod diff;
pub use diff::{Changes, diff};

pub mod fetch;
pub use fetch::{FileStateFetcher, Locator, StateFetcher, UrlStateFetcher};

mod replicate;
pub use replicate::{DryRunReplicator, Replicator};

mod notify;
pub use notify::{LogNotifier, Notifier};

mod source;
pub use source::{ConfigSource, FileConfigSource};

mod tasks;
pub use tasks::{ConfigRefreshTask, ReconcileTask, RegistrationTask, register_satellite};
