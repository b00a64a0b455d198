mod config;
mod error;

pub use config::{LOG_FORMAT_ENV, LoggerConfig, LoggerFormat, SATELLITE_TARGETS};
pub use error::LoggerError;

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Journald identifier of the agent.
#[cfg(all(target_os = "linux", feature = "journald"))]
const SYSLOG_IDENTIFIER: &str = "satellite";

/// Install the global subscriber. Fails if one is already installed.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let directives = cfg.directives()?;
    let filter = EnvFilter::try_new(&directives).map_err(|e| LoggerError::InvalidLogLevel {
        level: cfg.level.clone(),
        reason: e.to_string(),
    })?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match cfg.format {
        LoggerFormat::Text => registry
            .with(fmt::layer().with_ansi(cfg.use_color).with_timer(local_timer()))
            .try_init(),
        LoggerFormat::Json => registry
            .with(fmt::layer().json().with_ansi(false).with_timer(local_timer()))
            .try_init(),
        LoggerFormat::Journald => registry.with(journald_layer()?).try_init(),
    };
    installed.map_err(|_| LoggerError::AlreadyInitialized)
}

fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer() -> Result<tracing_journald::Layer, LoggerError> {
    tracing_journald::layer()
        .map(|layer| layer.with_syslog_identifier(SYSLOG_IDENTIFIER.to_string()))
        .map_err(LoggerError::Journald)
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer() -> Result<tracing_subscriber::layer::Identity, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
