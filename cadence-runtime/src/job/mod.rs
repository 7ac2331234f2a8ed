//! Jobs bind a schedule to a task and decide when the task may run.

mod cron;
mod long_interval;
mod simple_interval;

pub use cron::CronJob;
pub use long_interval::LongIntervalJob;
pub use simple_interval::SimpleIntervalJob;

use std::fmt;

use crate::error::SchedulerError;
use crate::schedule::SimpleIntervalSchedule;

/// Longest period a single timer can wait, in milliseconds (2^31 - 1).
pub const MAX_TIMER_DURATION_MS: u64 = 2_147_483_647;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Running,
    Stopped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Options shared by every job kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Registry key. Jobs without an id can run but cannot be looked up.
    pub id: Option<String>,
    /// Skip a firing while the previous execution of the task is still in flight.
    pub prevent_overrun: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            id: None,
            prevent_overrun: true,
        }
    }
}

impl JobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn prevent_overrun(mut self, prevent_overrun: bool) -> Self {
        self.prevent_overrun = prevent_overrun;
        self
    }
}

/// Lifecycle shared by interval and cron jobs.
///
/// `status` reports whether the job's timer or cron handle is armed, not
/// whether an execution is currently in flight.
pub trait Job: Send + Sync {
    fn id(&self) -> Option<&str>;

    /// Arm the job. Restarting a running job disarms it first.
    fn start(&self) -> Result<(), SchedulerError>;

    /// Disarm the job. Calling it on a stopped job does nothing.
    fn stop(&self);

    fn status(&self) -> JobStatus;
}

/// Period of a schedule that has to fit into one timer.
pub(crate) fn checked_period(schedule: &SimpleIntervalSchedule) -> Result<u64, SchedulerError> {
    let millis = schedule.to_millis();
    if millis == 0 {
        return Err(SchedulerError::InvalidInterval(
            "interval must be at least 1ms".to_string(),
        ));
    }
    if millis >= MAX_TIMER_DURATION_MS {
        return Err(SchedulerError::IntervalTooLong {
            millis,
            max: MAX_TIMER_DURATION_MS,
        });
    }
    Ok(millis)
}
