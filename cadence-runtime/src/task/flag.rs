use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Count of in-flight executions of one task.
///
/// The task reads as executing while the count is non-zero. Each execution
/// holds an [`ExecutingGuard`] which decrements the count when dropped, so the
/// flag clears on success, on error, on panic and when an async execution is
/// dropped before completing.
#[derive(Debug, Default, Clone)]
pub(crate) struct ExecutingFlag {
    in_flight: Arc<AtomicUsize>,
}

impl ExecutingFlag {
    pub(crate) fn enter(&self) -> ExecutingGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        ExecutingGuard {
            in_flight: self.in_flight.clone(),
        }
    }

    /// Enter unless `exclusive` is set and an execution is already in flight.
    ///
    /// The exclusive check and the increment are one compare-and-swap, so two
    /// ticks racing on different worker threads cannot both get through.
    pub(crate) fn try_enter(&self, exclusive: bool) -> Option<ExecutingGuard> {
        if !exclusive {
            return Some(self.enter());
        }
        self.in_flight
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(ExecutingGuard {
            in_flight: self.in_flight.clone(),
        })
    }

    pub(crate) fn is_set(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

pub(crate) struct ExecutingGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ExecutingGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
