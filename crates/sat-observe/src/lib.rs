mod logger;
pub use logger::*;

mod journal;
pub use journal::{EventJournal, log_event, message_for};
