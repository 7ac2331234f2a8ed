//! Schedules: structured interval durations and cron expressions.

use config::Config;
use serde::{Deserialize, Serialize};

use crate::config::resolve_config_value;
use crate::error::SchedulerError;
use crate::time_unit::TimeUnit;

pub const CRON_EVERY_SECOND: &str = "* * * * * *";
pub const CRON_EVERY_30_SECONDS: &str = "*/30 * * * * *";
pub const CRON_EVERY_MINUTE: &str = "0 * * * * *";
pub const CRON_EVERY_30_MINUTES: &str = "0 */30 * * * *";
pub const CRON_EVERY_HOUR: &str = "0 0 * * * *";

/// Period of an interval job, expressed as a sum of units.
///
/// Every field defaults to zero. The total is `to_millis()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleIntervalSchedule {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub milliseconds: u64,
    /// Execute the task once when the job starts, before the first period elapses.
    pub run_immediately: bool,
}

impl SimpleIntervalSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn days(mut self, days: u64) -> Self {
        self.days = days;
        self
    }

    pub fn hours(mut self, hours: u64) -> Self {
        self.hours = hours;
        self
    }

    pub fn minutes(mut self, minutes: u64) -> Self {
        self.minutes = minutes;
        self
    }

    pub fn seconds(mut self, seconds: u64) -> Self {
        self.seconds = seconds;
        self
    }

    pub fn milliseconds(mut self, milliseconds: u64) -> Self {
        self.milliseconds = milliseconds;
        self
    }

    pub fn run_immediately(mut self, run_immediately: bool) -> Self {
        self.run_immediately = run_immediately;
        self
    }

    /// Total period in milliseconds (saturates instead of overflowing).
    pub fn to_millis(&self) -> u64 {
        TimeUnit::Milliseconds
            .to_millis(self.milliseconds)
            .saturating_add(TimeUnit::Seconds.to_millis(self.seconds))
            .saturating_add(TimeUnit::Minutes.to_millis(self.minutes))
            .saturating_add(TimeUnit::Hours.to_millis(self.hours))
            .saturating_add(TimeUnit::Days.to_millis(self.days))
    }

    /// Read a schedule from configuration.
    ///
    /// The value under `key` is either a table of duration fields
    /// (`{ minutes = 5, run_immediately = true }`) or a shorthand string such
    /// as `"30s"`, which may itself be a `${placeholder:default}`.
    pub fn from_config(config: &Config, key: &str) -> Result<Self, SchedulerError> {
        if let Ok(raw) = config.get_string(key) {
            let resolved = resolve_config_value(&raw, config)?;
            let (value, unit) = TimeUnit::parse_duration(&resolved).ok_or_else(|| {
                SchedulerError::Config(format!("invalid interval '{}' at {}", resolved, key))
            })?;
            return Ok(unit.schedule(value));
        }

        Ok(config.get::<SimpleIntervalSchedule>(key)?)
    }
}

/// Schedule of a cron job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    /// Six-field expression, seconds first: `sec min hour day-of-month month day-of-week`.
    pub cron_expression: String,
    /// IANA timezone name; the cron engine's default applies when unset.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl CronSchedule {
    pub fn new(cron_expression: impl Into<String>) -> Self {
        Self {
            cron_expression: cron_expression.into(),
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}
