//! Error handlers receive contained task failures.
//!
//! A handler may itself fail: a synchronous handler by returning `Err` or
//! panicking, an asynchronous one by resolving to `Err` or panicking while
//! polled. That secondary failure is logged together with the original error
//! and then dropped. Nothing above the handler ever sees it.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::error;

use crate::error::TaskError;

type SyncHandlerFn = dyn Fn(TaskError) -> anyhow::Result<()> + Send + Sync;
type AsyncHandlerFn = dyn Fn(TaskError) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// What a task does with a failed execution.
#[derive(Clone, Default)]
pub enum ErrorHandler {
    /// Log the failure at `error` level, keyed by task id.
    #[default]
    Log,
    Sync(Arc<SyncHandlerFn>),
    Async(Arc<AsyncHandlerFn>),
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorHandler::Log => write!(f, "ErrorHandler::Log"),
            ErrorHandler::Sync(_) => write!(f, "ErrorHandler::Sync(..)"),
            ErrorHandler::Async(_) => write!(f, "ErrorHandler::Async(..)"),
        }
    }
}

enum Invocation {
    Done(anyhow::Result<()>),
    Pending(BoxFuture<'static, anyhow::Result<()>>),
}

impl ErrorHandler {
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(TaskError) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        ErrorHandler::Sync(Arc::new(handler))
    }

    pub fn future<F, Fut>(handler: F) -> Self
    where
        F: Fn(TaskError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        ErrorHandler::Async(Arc::new(move |err| handler(err).boxed()))
    }

    /// Handle a failure and wait for the handler to settle.
    pub(crate) async fn handle(&self, err: TaskError) {
        let task_id = err.task_id().to_string();
        let original = err.to_string();
        let result = match self.invoke(err) {
            Invocation::Done(result) => result,
            Invocation::Pending(fut) => contain_future(fut).await,
        };
        if let Err(e) = result {
            log_secondary_failure(&task_id, &original, &e);
        }
    }

    /// Handle a failure from synchronous code. An asynchronous handler's
    /// outcome is driven in the background.
    pub(crate) fn dispatch(&self, err: TaskError) {
        let task_id = err.task_id().to_string();
        let original = err.to_string();
        match self.invoke(err) {
            Invocation::Done(Ok(())) => {}
            Invocation::Done(Err(e)) => log_secondary_failure(&task_id, &original, &e),
            Invocation::Pending(fut) => {
                let settle = async move {
                    if let Err(e) = contain_future(fut).await {
                        log_secondary_failure(&task_id, &original, &e);
                    }
                };
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        runtime.spawn(settle);
                    }
                    Err(_) => futures::executor::block_on(settle),
                }
            }
        }
    }

    fn invoke(&self, err: TaskError) -> Invocation {
        match self {
            ErrorHandler::Log => {
                log_task_error(&err);
                Invocation::Done(Ok(()))
            }
            ErrorHandler::Sync(handler) => Invocation::Done(
                panic::catch_unwind(AssertUnwindSafe(|| handler(err)))
                    .unwrap_or_else(|payload| Err(panic_to_error(payload))),
            ),
            ErrorHandler::Async(handler) => {
                match panic::catch_unwind(AssertUnwindSafe(|| handler(err))) {
                    Ok(fut) => Invocation::Pending(fut),
                    Err(payload) => Invocation::Done(Err(panic_to_error(payload))),
                }
            }
        }
    }
}

async fn contain_future(fut: BoxFuture<'static, anyhow::Result<()>>) -> anyhow::Result<()> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panic_to_error(payload)))
}

fn panic_to_error(payload: Box<dyn std::any::Any + Send>) -> anyhow::Error {
    anyhow::anyhow!("{}", TaskError::from_panic("", None, payload))
}

fn log_task_error(err: &TaskError) {
    error!(
        task_id = %err.task_id(),
        job_id = ?err.job_id(),
        error = %err,
        "Error while handling task"
    );
}

fn log_secondary_failure(task_id: &str, original: &str, err: &anyhow::Error) {
    error!(
        task_id = %task_id,
        original_error = %original,
        error = %err,
        "Error while trying to log an error"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn failure(message: &str) -> TaskError {
        TaskError::Failed {
            task_id: "task".to_string(),
            job_id: None,
            source: anyhow::anyhow!(message.to_string()),
        }
    }

    #[test]
    fn test_sync_handler_receives_failure() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = seen.clone();
        let handler = ErrorHandler::sync(move |err| {
            *sink.lock() = Some(err.to_string());
            Ok(())
        });

        handler.dispatch(failure("kaboomSync"));
        assert_eq!(seen.lock().as_deref(), Some("kaboomSync"));
    }

    #[test]
    fn test_failing_sync_handler_is_swallowed() {
        let handler = ErrorHandler::sync(|_| Err(anyhow::anyhow!("handler broke")));
        handler.dispatch(failure("first"));

        let panicking = ErrorHandler::sync(|_| panic!("handler panicked"));
        panicking.dispatch(failure("first"));
    }

    #[tokio::test]
    async fn test_async_handler_is_awaited() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = ErrorHandler::future(move |_| {
            let counter = counter.clone();
            async move {
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        handler.handle(failure("kaboom")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_async_handler_is_swallowed() {
        let rejecting =
            ErrorHandler::future(|_| async { Err::<(), _>(anyhow::anyhow!("rejected")) });
        rejecting.handle(failure("kaboom")).await;

        let panicking = ErrorHandler::future(|err: TaskError| async move {
            if err.task_id() == "task" {
                panic!("async handler panicked");
            }
            Ok(())
        });
        panicking.handle(failure("kaboom")).await;
    }

    #[test]
    fn test_async_handler_outside_runtime_runs_to_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = ErrorHandler::future(move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        handler.dispatch(failure("kaboom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
