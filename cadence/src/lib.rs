//! # Cadence - In-process Job Scheduling for tokio
//!
//! Cadence runs recurring work inside a tokio application: plain intervals,
//! intervals longer than a single timer can hold, and cron expressions.
//!
//! ## Features
//!
//! - **Simple intervals**: Run a task every few milliseconds up to about 24.8 days
//! - **Long intervals**: Chain timers for periods of a month or more
//! - **Cron expressions**: Six-field cron syntax with optional IANA time zones
//! - **Overrun protection**: Skip a firing while the previous one still runs
//! - **Error containment**: Failures and panics go to a per-task error handler
//! - **Registry**: Look up, stop, restart and remove jobs by id
//! - **Config support**: Scheduler defaults and intervals from TOML or YAML
//!
//! ## Quick Start
//!
//! ```rust
//! use cadence::{Scheduler, SimpleIntervalJob, SimpleIntervalSchedule, Task};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cadence::SchedulerError> {
//!     let scheduler = Scheduler::new();
//!
//!     let task = Task::new("heartbeat", |ctx| {
//!         println!("tick from {:?}", ctx.job_id);
//!         Ok(())
//!     });
//!     let job = SimpleIntervalJob::new(SimpleIntervalSchedule::new().seconds(30), task)
//!         .with_id("heartbeat");
//!     scheduler.add_simple_interval_job(job)?;
//!
//!     assert!(scheduler.exists_by_id("heartbeat"));
//!     scheduler.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Async Tasks and Overruns
//!
//! ```rust
//! use cadence::{AsyncTask, Scheduler, SimpleIntervalJob, SimpleIntervalSchedule};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), cadence::SchedulerError> {
//! let scheduler = Scheduler::new();
//! let task = AsyncTask::new("sync-users", |_ctx| async {
//!     // slow network call
//!     Ok(())
//! })
//! .with_error_handler(|err| {
//!     eprintln!("sync failed: {err}");
//!     Ok(())
//! });
//!
//! // Firings that come due while a sync is still running are skipped.
//! let job = SimpleIntervalJob::new(SimpleIntervalSchedule::new().minutes(5), task)
//!     .with_id("sync-users")
//!     .with_prevent_overrun(true);
//! scheduler.add_simple_interval_job(job)?;
//! # scheduler.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Cron Jobs
//!
//! ```rust,no_run
//! use cadence::{CronJob, CronSchedule, Scheduler, Task};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cadence::SchedulerError> {
//!     let scheduler = Scheduler::new();
//!     let report = Task::new("report", |_| Ok(()));
//!     let schedule = CronSchedule::new("0 0 9 * * Mon-Fri").with_timezone("Europe/Berlin");
//!     scheduler.add_cron_job(CronJob::new(schedule, report).with_id("report"))?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     scheduler.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Create `config/application.toml`:
//!
//! ```toml
//! [scheduler]
//! prevent_overrun = true
//! default_timezone = "UTC"
//!
//! [jobs.cleanup]
//! hours = 6
//! run_immediately = true
//! ```
//!
//! Or `config/application.yaml`:
//!
//! ```yaml
//! scheduler:
//!   prevent_overrun: true
//!   default_timezone: UTC
//! jobs:
//!   cleanup:
//!     hours: 6
//!     run_immediately: true
//! ```
//!
//! Environment variables with the `CADENCE_` prefix override file values:
//!
//! ```bash
//! export CADENCE_SCHEDULER__PREVENT_OVERRUN=false
//! export CADENCE_JOBS__CLEANUP__HOURS=12
//! ```
//!
//! Then build the scheduler from the file:
//!
//! ```rust,no_run
//! use cadence::{SchedulerBuilder, SimpleIntervalJob, SimpleIntervalSchedule, Task};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), cadence::SchedulerError> {
//! let scheduler = SchedulerBuilder::with_toml("config/application.toml")?.build()?;
//! let schedule = SimpleIntervalSchedule::from_config(scheduler.config(), "jobs.cleanup")?;
//! let job = SimpleIntervalJob::with_options(
//!     schedule,
//!     Task::new("cleanup", |_| Ok(())),
//!     scheduler.job_options("cleanup"),
//! );
//! scheduler.add_simple_interval_job(job)?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use cadence_runtime::{
    AsyncTask, CronJob, CronJobEngine, CronSchedule, ErrorHandler, IntervalJob, Job, JobOptions,
    JobStatus, JobTask, LongIntervalJob, Scheduler, SchedulerBuilder, SchedulerEngine,
    SchedulerError, SchedulerSettings, SimpleIntervalEngine, SimpleIntervalJob,
    SimpleIntervalSchedule, Task, TaskContext, TaskError, TimeUnit, MAX_TIMER_DURATION_MS,
};

// Cron engine seam
pub use cadence_runtime::{CronCallback, CronEngine, CronHandle, ManualCronEngine, TokioCronEngine};

// Config helpers and common cron expressions
pub use cadence_runtime::{
    load_toml_config, load_yaml_config, resolve_config_value, CRON_EVERY_30_MINUTES,
    CRON_EVERY_30_SECONDS, CRON_EVERY_HOUR, CRON_EVERY_MINUTE, CRON_EVERY_SECOND, SETTINGS_KEY,
};

// Full runtime crate for the less common items
pub use cadence_runtime;
