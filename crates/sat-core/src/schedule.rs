//! Cron expression parsing.
//!
//! Accepted forms:
//! - `@every <duration>` with Go-style durations (`00h00m05s`, `30s`, `1h30m`, `250ms`);
//! - descriptors `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`, `@midnight`, `@hourly`;
//! - 5-field cron (`min hour dom month dow`, seconds fixed at 0);
//! - 6 or 7 field cron with seconds, as understood by the `cron` crate.
use std::{str::FromStr, time::Duration};

use chrono::{DateTime, Utc};

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub enum CronSchedule {
    /// Fixed interval between triggers.
    Every(Duration),
    /// Calendar-based schedule.
    Calendar(Box<cron::Schedule>),
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, CoreError> {
        let invalid = |reason: String| CoreError::InvalidCron {
            expr: expr.to_string(),
            reason,
        };

        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty expression".into()));
        }
        if let Some(rest) = trimmed.strip_prefix("@every") {
            return parse_go_duration(rest.trim())
                .map(CronSchedule::Every)
                .map_err(invalid);
        }

        let normalized = match trimmed {
            "@yearly" | "@annually" => "0 0 0 1 1 *".to_string(),
            "@monthly" => "0 0 0 1 * *".to_string(),
            "@weekly" => "0 0 0 * * Sun".to_string(),
            "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
            "@hourly" => "0 0 * * * *".to_string(),
            other if other.starts_with('@') => {
                return Err(invalid(format!("unknown descriptor {other}")));
            }
            other => match other.split_whitespace().count() {
                5 => format!("0 {other}"),
                6 | 7 => other.to_string(),
                n => return Err(invalid(format!("expected 5 to 7 fields, found {n}"))),
            },
        };

        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))?;
        Ok(CronSchedule::Calendar(Box::new(schedule)))
    }

    /// Time to wait from `now` until the next trigger.
    ///
    /// `None` when a calendar schedule has no upcoming occurrence.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            CronSchedule::Every(interval) => Some(*interval),
            CronSchedule::Calendar(schedule) => schedule
                .after(&now)
                .next()
                .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO)),
        }
    }
}

/// Parse a Go `time.Duration` string such as `1h2m3s` or `00h00m05s`.
fn parse_go_duration(s: &str) -> Result<Duration, String> {
    if s.is_empty() {
        return Err("missing duration after @every".into());
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("invalid duration {s:?}"));
        }
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("invalid number in duration {s:?}"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            "" => return Err(format!("missing unit in duration {s:?}")),
            unit => return Err(format!("unknown unit {unit:?} in duration {s:?}")),
        };
        rest = &rest[unit_len..];
        total = Duration::try_from_secs_f64(value * scale)
            .ok()
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("duration out of range {s:?}"))?;
    }

    if total.is_zero() {
        return Err("interval must be positive".into());
    }
    Ok(total)
}
