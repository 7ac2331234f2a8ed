//! Cadence Runtime - in-process interval and cron job scheduling
//!
//! Tasks wrap units of work with error containment and an executing flag.
//! Jobs bind a task to an interval or cron schedule, engines start and stop
//! jobs, and the [`Scheduler`] keeps track of jobs by id.

mod config;
mod error;
mod schedule;
mod time_unit;
pub mod cron_engine;
pub mod engine;
pub mod job;
pub mod scheduler;
pub mod task;

// Re-export public API
pub use crate::config::{
    load_toml_config, load_yaml_config, resolve_config_value, SchedulerSettings, SETTINGS_KEY,
};
pub use cron_engine::{CronCallback, CronEngine, CronHandle, ManualCronEngine, TokioCronEngine};
pub use engine::{CronJobEngine, IntervalJob, SchedulerEngine, SimpleIntervalEngine};
pub use error::{SchedulerError, TaskError};
pub use job::{
    CronJob, Job, JobOptions, JobStatus, LongIntervalJob, SimpleIntervalJob,
    MAX_TIMER_DURATION_MS,
};
pub use schedule::{
    CronSchedule, SimpleIntervalSchedule, CRON_EVERY_30_MINUTES, CRON_EVERY_30_SECONDS,
    CRON_EVERY_HOUR, CRON_EVERY_MINUTE, CRON_EVERY_SECOND,
};
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use task::{AsyncTask, ErrorHandler, JobTask, Task, TaskContext};
pub use time_unit::TimeUnit;
