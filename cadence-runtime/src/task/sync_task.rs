use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use crate::error::TaskError;

use super::error_handler::ErrorHandler;
use super::flag::{ExecutingFlag, ExecutingGuard};
use super::TaskContext;

type SyncHandler = dyn Fn(TaskContext) -> anyhow::Result<()> + Send + Sync;

/// A synchronous unit of work.
///
/// `execute` runs the handler on the calling thread. An `Err` or a panic from
/// the handler goes to the error handler; `execute` itself never fails.
/// Handlers run on the job's timer task, so long blocking work belongs in an
/// [`AsyncTask`](super::AsyncTask) that hands it to `spawn_blocking`.
pub struct Task {
    id: String,
    handler: Box<SyncHandler>,
    error_handler: ErrorHandler,
    executing: ExecutingFlag,
}

impl Task {
    pub fn new<F>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(TaskContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            handler: Box::new(handler),
            error_handler: ErrorHandler::default(),
            executing: ExecutingFlag::default(),
        }
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(TaskError) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.error_handler = ErrorHandler::sync(handler);
        self
    }

    /// Use an asynchronous error handler; its outcome settles in the background.
    pub fn with_async_error_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(TaskError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.error_handler = ErrorHandler::future(handler);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_executing(&self) -> bool {
        self.executing.is_set()
    }

    pub fn execute(&self, job_id: Option<&str>) {
        self.run(TaskContext::now(&self.id, job_id));
    }

    pub(crate) fn run(&self, ctx: TaskContext) {
        self.run_guarded(ctx, self.executing.enter());
    }

    pub(crate) fn try_enter(&self, exclusive: bool) -> Option<ExecutingGuard> {
        self.executing.try_enter(exclusive)
    }

    /// Run under a guard the caller already holds; it is released once the
    /// handler returns, before the error handler sees a failure.
    pub(crate) fn run_guarded(&self, ctx: TaskContext, guard: ExecutingGuard) {
        let job_id = ctx.job_id.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(ctx)));
        drop(guard);

        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(source)) => TaskError::Failed {
                task_id: self.id.clone(),
                job_id,
                source,
            },
            Err(payload) => TaskError::from_panic(&self.id, job_id.as_deref(), payload),
        };
        self.error_handler.dispatch(err);
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("is_executing", &self.is_executing())
            .field("error_handler", &self.error_handler)
            .finish()
    }
}
