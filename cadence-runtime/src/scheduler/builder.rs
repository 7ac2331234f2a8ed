use std::path::Path;
use std::sync::Arc;

use config::Config;
use tracing::info;

use super::scheduler::Scheduler;
use crate::config::{load_toml_config, load_yaml_config, SchedulerSettings};
use crate::cron_engine::{CronEngine, TokioCronEngine};
use crate::error::SchedulerError;

/// Builder for the scheduler
pub struct SchedulerBuilder {
    config: Arc<Config>,
    cron_engine: Option<Arc<dyn CronEngine>>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    /// Create a new scheduler builder with default config (empty)
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create with TOML config file
    pub fn with_toml<P: AsRef<Path>>(path: P) -> Result<Self, SchedulerError> {
        Ok(Self::with_config(load_toml_config(path)?))
    }

    /// Create with YAML config file
    pub fn with_yaml<P: AsRef<Path>>(path: P) -> Result<Self, SchedulerError> {
        Ok(Self::with_config(load_yaml_config(path)?))
    }

    /// Create with custom config
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            cron_engine: None,
        }
    }

    /// Use `engine` for cron jobs instead of a [`TokioCronEngine`].
    pub fn with_cron_engine(mut self, engine: Arc<dyn CronEngine>) -> Self {
        self.cron_engine = Some(engine);
        self
    }

    /// Build the scheduler.
    ///
    /// Reads the `[scheduler]` settings table; without a custom cron engine a
    /// [`TokioCronEngine`] in the configured default time zone is used.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cadence_runtime::SchedulerBuilder;
    ///
    /// # fn main() -> Result<(), cadence_runtime::SchedulerError> {
    /// let scheduler = SchedulerBuilder::new().build()?;
    /// assert!(scheduler.settings().prevent_overrun);
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        let settings = SchedulerSettings::from_config(&self.config)?;
        let cron_engine: Arc<dyn CronEngine> = match self.cron_engine {
            Some(engine) => engine,
            None => Arc::new(TokioCronEngine::from_settings(&settings)?),
        };

        info!(
            prevent_overrun = settings.prevent_overrun,
            default_timezone = %settings.default_timezone,
            "Building scheduler"
        );

        Ok(Scheduler::from_parts(self.config, settings, cron_engine))
    }
}
