use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {value:?} (expected text, json or journald)")]
    InvalidFormat { value: String },

    #[error("journald logging is unavailable in this build")]
    JournaldNotSupported,

    #[error("failed to connect to journald: {0}")]
    Journald(#[source] std::io::Error),

    #[error("invalid log level {level:?}: {reason}")]
    InvalidLogLevel { level: String, reason: String },

    #[error("a global logger is already installed")]
    AlreadyInitialized,
}
