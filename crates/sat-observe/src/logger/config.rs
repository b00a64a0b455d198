use std::{io::IsTerminal, str::FromStr};

use tracing::level_filters::LevelFilter;

use crate::logger::error::LoggerError;

/// Selects the output format of the `satellite` binary.
pub const LOG_FORMAT_ENV: &str = "SATELLITE_LOG_FORMAT";

/// Targets that follow the configured level. Everything else is capped at `warn`.
pub const SATELLITE_TARGETS: &[&str] = &["satellite", "sat_agentd", "sat_core", "sat_state", "sat_observe"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggerFormat {
    #[default]
    Text,
    Json,
    Journald,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LoggerFormat::Text),
            "json" => Ok(LoggerFormat::Json),
            "journald" | "journal" if cfg!(all(target_os = "linux", feature = "journald")) => {
                Ok(LoggerFormat::Journald)
            }
            "journald" | "journal" => Err(LoggerError::JournaldNotSupported),
            _ => Err(LoggerError::InvalidFormat { value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// A bare level (`debug`) or full `EnvFilter` directives (`sat_state=trace,info`).
    pub level: String,
    pub use_color: bool,
}

impl LoggerConfig {
    /// Level from the configuration file, format from [`LOG_FORMAT_ENV`].
    pub fn from_env(level: &str) -> Result<Self, LoggerError> {
        Self::resolve(level, std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    /// An empty level means `info`; a missing or empty format means text.
    pub fn resolve(level: &str, format: Option<&str>) -> Result<Self, LoggerError> {
        let format = match format.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => f.parse()?,
            None => LoggerFormat::Text,
        };
        let level = match level.trim() {
            "" => "info",
            l => l,
        };
        Ok(Self {
            format,
            level: level.to_string(),
            use_color: format == LoggerFormat::Text && std::io::stdout().is_terminal(),
        })
    }

    /// `EnvFilter` directives for this configuration.
    ///
    /// A bare level applies to [`SATELLITE_TARGETS`]; other crates log at
    /// `warn` or the configured level, whichever is quieter. Explicit
    /// directives are used as given.
    pub fn directives(&self) -> Result<String, LoggerError> {
        if self.level.contains(['=', ',']) {
            return Ok(self.level.clone());
        }
        let level: LevelFilter = self.level.parse().map_err(|e| LoggerError::InvalidLogLevel {
            level: self.level.clone(),
            reason: format!("{e}"),
        })?;

        let name = |l: LevelFilter| l.to_string().to_ascii_lowercase();
        let mut out = name(level.min(LevelFilter::WARN));
        for target in SATELLITE_TARGETS {
            out.push_str(&format!(",{target}={}", name(level)));
        }
        Ok(out)
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            use_color: std::io::stdout().is_terminal(),
        }
    }
}
