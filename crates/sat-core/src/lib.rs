//! Runtime of the satellite agent.
//!
//! - [`Scheduler`] triggers [`Task`]s on cron expressions, one tokio task per tick;
//! - [`EventBroker`] fans typed [`Event`]s out to every subscriber of a topic;
//! - [`task::trigger`] is the Idle → Running → Idle/Terminated protocol every tick goes through;
//! - [`ConfigStore`] is the injected, snapshot-swapped agent configuration.

pub mod error;
pub use error::{CoreError, TaskError};

pub mod schedule;
pub use schedule::CronSchedule;

pub mod broker;
pub use broker::{Event, EventBroker, Payload, Subscription, topics};

pub mod task;
pub use task::{Completion, Phase, Task, TaskHandle, TaskRef, Tick};

pub mod scheduler;
pub use scheduler::{Scheduler, SchedulerConfig};

pub mod store;
pub use store::ConfigStore;
