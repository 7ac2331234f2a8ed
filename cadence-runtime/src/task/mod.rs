//! Units of work with error containment and an executing flag.

mod async_task;
mod error_handler;
mod flag;
mod sync_task;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tokio::time::Instant;

pub use async_task::AsyncTask;
pub use error_handler::ErrorHandler;
pub use sync_task::Task;

/// What every handler receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub task_id: String,
    /// Id of the job that fired this execution, if any.
    pub job_id: Option<String>,
    /// Instant the firing tick was scheduled for.
    pub scheduled_at: Instant,
    /// Wall-clock time the execution started.
    pub fired_at: DateTime<Utc>,
}

impl TaskContext {
    pub(crate) fn new(task_id: &str, job_id: Option<&str>, scheduled_at: Instant) -> Self {
        Self {
            task_id: task_id.to_string(),
            job_id: job_id.map(str::to_string),
            scheduled_at,
            fired_at: Utc::now(),
        }
    }

    pub(crate) fn now(task_id: &str, job_id: Option<&str>) -> Self {
        Self::new(task_id, job_id, Instant::now())
    }
}

/// The task a job drives: either kind, shared with the caller.
///
/// Jobs that share one task also share its executing flag, so a run fired by
/// one of them makes the others skip while `prevent_overrun` is set.
#[derive(Debug, Clone)]
pub enum JobTask {
    Sync(Arc<Task>),
    Async(Arc<AsyncTask>),
}

impl JobTask {
    pub fn id(&self) -> &str {
        match self {
            JobTask::Sync(task) => task.id(),
            JobTask::Async(task) => task.id(),
        }
    }

    pub fn is_executing(&self) -> bool {
        match self {
            JobTask::Sync(task) => task.is_executing(),
            JobTask::Async(task) => task.is_executing(),
        }
    }

    /// Fire and forget: a sync task runs inline, an async task is spawned.
    pub(crate) fn fire(&self, job_id: Option<&str>, scheduled_at: Instant) {
        let ctx = TaskContext::new(self.id(), job_id, scheduled_at);
        match self {
            JobTask::Sync(task) => task.run(ctx),
            JobTask::Async(task) => task.spawn(ctx),
        }
    }

    /// Like [`fire`](Self::fire), unless `prevent_overrun` is set and an
    /// execution is still in flight. Returns whether the task was fired.
    pub(crate) fn try_fire(
        &self,
        job_id: Option<&str>,
        scheduled_at: Instant,
        prevent_overrun: bool,
    ) -> bool {
        let ctx = TaskContext::new(self.id(), job_id, scheduled_at);
        match self {
            JobTask::Sync(task) => match task.try_enter(prevent_overrun) {
                Some(guard) => task.run_guarded(ctx, guard),
                None => return false,
            },
            JobTask::Async(task) => match task.try_enter(prevent_overrun) {
                Some(guard) => task.spawn_guarded(ctx, guard),
                None => return false,
            },
        }
        true
    }

    /// Start an execution and return a future that settles with it, or `None`
    /// when the overrun check refuses it.
    ///
    /// The executing flag is set before this returns: a sync task has already
    /// run to completion, an async task has been launched.
    pub(crate) fn try_launch(
        &self,
        job_id: Option<&str>,
        scheduled_at: Instant,
        prevent_overrun: bool,
    ) -> Option<BoxFuture<'static, ()>> {
        let ctx = TaskContext::new(self.id(), job_id, scheduled_at);
        match self {
            JobTask::Sync(task) => {
                let guard = task.try_enter(prevent_overrun)?;
                task.run_guarded(ctx, guard);
                Some(future::ready(()).boxed())
            }
            JobTask::Async(task) => {
                let guard = task.try_enter(prevent_overrun)?;
                Some(task.launch_guarded(ctx, guard))
            }
        }
    }
}

impl From<Task> for JobTask {
    fn from(task: Task) -> Self {
        JobTask::Sync(Arc::new(task))
    }
}

impl From<Arc<Task>> for JobTask {
    fn from(task: Arc<Task>) -> Self {
        JobTask::Sync(task)
    }
}

impl From<AsyncTask> for JobTask {
    fn from(task: AsyncTask) -> Self {
        JobTask::Async(Arc::new(task))
    }
}

impl From<Arc<AsyncTask>> for JobTask {
    fn from(task: Arc<AsyncTask>) -> Self {
        JobTask::Async(task)
    }
}
