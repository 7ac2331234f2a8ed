use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::warn;

use crate::error::TaskError;

use super::error_handler::ErrorHandler;
use super::flag::{ExecutingFlag, ExecutingGuard};
use super::TaskContext;

type AsyncHandler = dyn Fn(TaskContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// An asynchronous unit of work.
///
/// The task counts as executing from the moment an execution is launched
/// until its future settles. A panic while producing the future, a panic while
/// polling it and an `Err` result are all routed to the error handler.
pub struct AsyncTask {
    id: String,
    handler: Box<AsyncHandler>,
    error_handler: ErrorHandler,
    executing: ExecutingFlag,
}

impl AsyncTask {
    pub fn new<F, Fut>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            id: id.into(),
            handler: Box::new(move |ctx| handler(ctx).boxed()),
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

    /// Launch an execution on the current tokio runtime and return at once.
    pub fn execute(&self, job_id: Option<&str>) {
        self.spawn(TaskContext::now(&self.id, job_id));
    }

    /// Launch an execution on the current tokio runtime and hand back a future
    /// that settles with it.
    ///
    /// The task reads as executing as soon as this returns. Dropping the
    /// returned future does not cancel the execution. Outside a runtime there
    /// is nothing to launch on, so the execution runs when the returned future
    /// is polled.
    pub fn execute_async(&self, job_id: Option<&str>) -> BoxFuture<'static, ()> {
        let execution = self.launch(TaskContext::now(&self.id, job_id));
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime.spawn(execution).map(|_| ()).boxed(),
            Err(_) => execution,
        }
    }

    pub(crate) fn try_enter(&self, exclusive: bool) -> Option<ExecutingGuard> {
        self.executing.try_enter(exclusive)
    }

    pub(crate) fn spawn(&self, ctx: TaskContext) {
        self.spawn_guarded(ctx, self.executing.enter());
    }

    pub(crate) fn spawn_guarded(&self, ctx: TaskContext, guard: ExecutingGuard) {
        let job_id = ctx.job_id.clone();
        let execution = self.launch_guarded(ctx, guard);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(execution);
            }
            Err(_) => {
                // Dropping the execution releases the executing flag.
                drop(execution);
                warn!(task_id = %self.id, "No tokio runtime, async task execution reported as failed");
                self.error_handler.dispatch(TaskError::Failed {
                    task_id: self.id.clone(),
                    job_id,
                    source: anyhow::anyhow!("no tokio runtime available to run async task"),
                });
            }
        }
    }

    pub(crate) fn launch(&self, ctx: TaskContext) -> BoxFuture<'static, ()> {
        self.launch_guarded(ctx, self.executing.enter())
    }

    /// Produce the execution future under `guard`, which is held until the
    /// handler's future settles.
    pub(crate) fn launch_guarded(
        &self,
        ctx: TaskContext,
        guard: ExecutingGuard,
    ) -> BoxFuture<'static, ()> {
        let task_id = self.id.clone();
        let job_id = ctx.job_id.clone();
        let error_handler = self.error_handler.clone();
        let produced = panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(ctx)));

        async move {
            let outcome = match produced {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(payload) => Err(payload),
            };
            drop(guard);

            let err = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(source)) => TaskError::Failed {
                    task_id,
                    job_id,
                    source,
                },
                Err(payload) => TaskError::from_panic(&task_id, job_id.as_deref(), payload),
            };
            error_handler.handle(err).await;
        }
        .boxed()
    }
}

impl std::fmt::Debug for AsyncTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTask")
            .field("id", &self.id)
            .field("is_executing", &self.is_executing())
            .field("error_handler", &self.error_handler)
            .finish()
    }
}
