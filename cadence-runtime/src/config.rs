use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SchedulerError;

/// Key of the scheduler settings table.
pub const SETTINGS_KEY: &str = "scheduler";

/// Load config from a specific TOML file, overlaid with `CADENCE_*` environment variables
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<Config, SchedulerError> {
    load_config(path.as_ref(), FileFormat::Toml)
}

/// Load config from a specific YAML file, overlaid with `CADENCE_*` environment variables
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<Config, SchedulerError> {
    load_config(path.as_ref(), FileFormat::Yaml)
}

fn load_config(path: &Path, format: FileFormat) -> Result<Config, SchedulerError> {
    let config = Config::builder()
        .add_source(File::from(path).format(format))
        .add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    Ok(config)
}

/// Resolve config placeholder like ${app.interval} or ${app.interval:default}
pub fn resolve_config_value(value: &str, config: &Config) -> Result<String, SchedulerError> {
    let Some(inner) = value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Ok(value.to_string());
    };

    match inner.split_once(':') {
        Some((key, default_value)) => Ok(config
            .get_string(key)
            .unwrap_or_else(|_| default_value.to_string())),
        None => config
            .get_string(inner)
            .map_err(|e| SchedulerError::Config(format!("cannot resolve ${{{}}}: {}", inner, e))),
    }
}

/// Scheduler-wide defaults, read from the `[scheduler]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Default overrun policy handed out by `Scheduler::job_options`.
    #[serde(default = "default_prevent_overrun")]
    pub prevent_overrun: bool,

    /// Timezone for cron schedules that do not name one (IANA identifier).
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

fn default_prevent_overrun() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            prevent_overrun: default_prevent_overrun(),
            default_timezone: default_timezone(),
        }
    }
}

impl SchedulerSettings {
    /// Read settings from `config`, falling back to defaults when the table is absent.
    pub fn from_config(config: &Config) -> Result<Self, SchedulerError> {
        match config.get::<SchedulerSettings>(SETTINGS_KEY) {
            Ok(settings) => Ok(settings),
            Err(config::ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse the configured timezone into a `chrono_tz::Tz`.
    pub fn parse_timezone(&self) -> Result<chrono_tz::Tz, SchedulerError> {
        crate::cron_engine::parse_timezone(&self.default_timezone)
    }
}
