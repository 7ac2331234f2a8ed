//! Error types for scheduler operations and task failures.

use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

/// Errors surfaced to the caller of a scheduler, engine or job operation.
///
/// Task failures never show up here; they are contained by the task and
/// delivered to its error handler as a [`TaskError`].
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The period does not fit into a single timer.
    #[error(
        "interval of {millis}ms cannot be scheduled: timers are limited to {max}ms (about 24.85 days), use LongIntervalJob instead"
    )]
    IntervalTooLong { millis: u64, max: u64 },

    /// The period is not usable (zero length).
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Cron expression rejected by the cron engine
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// Timezone name is not a known IANA identifier
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// A job was started outside of a tokio runtime.
    #[error("no tokio runtime available to start job{}", .0.as_deref().map(|id| format!(" {id}")).unwrap_or_default())]
    NoRuntime(Option<String>),

    /// A cron job was started without a cron engine bound to it.
    #[error("no cron engine configured for cron job{}", .0.as_deref().map(|id| format!(" {id}")).unwrap_or_default())]
    NoCronEngine(Option<String>),

    /// Job id is already taken in the registry.
    #[error("Job with an id {0} is already registered")]
    DuplicateJobId(String),

    /// Job id is not present in the registry.
    #[error("Job with an id {0} is not registered")]
    JobNotFound(String),

    /// Error from the underlying tokio-cron-scheduler
    #[error("cron backend error: {0}")]
    CronBackend(String),

    /// Configuration could not be loaded or resolved
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<JobSchedulerError> for SchedulerError {
    fn from(err: JobSchedulerError) -> Self {
        SchedulerError::CronBackend(err.to_string())
    }
}

impl From<config::ConfigError> for SchedulerError {
    fn from(err: config::ConfigError) -> Self {
        SchedulerError::Config(err.to_string())
    }
}

/// A failed task execution, as handed to the task's error handler.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The handler returned an error (or its future resolved to one).
    #[error("{source}")]
    Failed {
        task_id: String,
        job_id: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    /// The handler panicked.
    #[error("task panicked: {message}")]
    Panicked {
        task_id: String,
        job_id: Option<String>,
        message: String,
    },
}

impl TaskError {
    pub fn task_id(&self) -> &str {
        match self {
            TaskError::Failed { task_id, .. } | TaskError::Panicked { task_id, .. } => task_id,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            TaskError::Failed { job_id, .. } | TaskError::Panicked { job_id, .. } => {
                job_id.as_deref()
            }
        }
    }

    pub(crate) fn from_panic(
        task_id: &str,
        job_id: Option<&str>,
        payload: Box<dyn std::any::Any + Send>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked {
            task_id: task_id.to_string(),
            job_id: job_id.map(str::to_string),
            message,
        }
    }
}
