use std::sync::Arc;

use tracing::debug;

use super::{JobList, SchedulerEngine};
use crate::error::SchedulerError;
use crate::job::{Job, LongIntervalJob, SimpleIntervalJob};

/// Either kind of interval job.
#[derive(Debug, Clone)]
pub enum IntervalJob {
    Simple(Arc<SimpleIntervalJob>),
    Long(Arc<LongIntervalJob>),
}

impl IntervalJob {
    pub fn id(&self) -> Option<&str> {
        match self {
            IntervalJob::Simple(job) => job.id(),
            IntervalJob::Long(job) => job.id(),
        }
    }

    pub fn into_job(self) -> Arc<dyn Job> {
        match self {
            IntervalJob::Simple(job) => job as Arc<dyn Job>,
            IntervalJob::Long(job) => job as Arc<dyn Job>,
        }
    }
}

impl From<SimpleIntervalJob> for IntervalJob {
    fn from(job: SimpleIntervalJob) -> Self {
        IntervalJob::Simple(Arc::new(job))
    }
}

impl From<Arc<SimpleIntervalJob>> for IntervalJob {
    fn from(job: Arc<SimpleIntervalJob>) -> Self {
        IntervalJob::Simple(job)
    }
}

impl From<LongIntervalJob> for IntervalJob {
    fn from(job: LongIntervalJob) -> Self {
        IntervalJob::Long(Arc::new(job))
    }
}

impl From<Arc<LongIntervalJob>> for IntervalJob {
    fn from(job: Arc<LongIntervalJob>) -> Self {
        IntervalJob::Long(job)
    }
}

/// Runs simple and long interval jobs.
#[derive(Default)]
pub struct SimpleIntervalEngine {
    jobs: JobList,
}

impl SimpleIntervalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the job and keep it. A job that fails to start is not kept.
    pub fn add(&self, job: impl Into<IntervalJob>) -> Result<Arc<dyn Job>, SchedulerError> {
        let job = job.into().into_job();
        job.start()?;
        debug!(job_id = ?job.id(), "Interval job added to engine");
        self.jobs.push(job.clone());
        Ok(job)
    }

    pub fn len(&self) -> usize {
        self.jobs.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchedulerEngine for SimpleIntervalEngine {
    fn stop(&self) {
        self.jobs.stop_all();
    }

    fn remove(&self, id: &str) -> Option<Arc<dyn Job>> {
        self.jobs.remove(id)
    }

    fn jobs(&self) -> Vec<Arc<dyn Job>> {
        self.jobs.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, MAX_TIMER_DURATION_MS};
    use crate::schedule::SimpleIntervalSchedule;
    use crate::task::Task;

    fn noop() -> Task {
        Task::new("noop", |_| Ok(()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_starts_and_stop_stops_all() {
        let engine = SimpleIntervalEngine::new();
        let simple = Arc::new(
            SimpleIntervalJob::new(SimpleIntervalSchedule::new().seconds(1), noop()).with_id("a"),
        );
        let long = Arc::new(
            LongIntervalJob::new(SimpleIntervalSchedule::new().days(30), noop()).with_id("b"),
        );

        engine.add(simple.clone()).expect("add simple");
        engine.add(long.clone()).expect("add long");
        assert_eq!(engine.len(), 2);
        assert_eq!(simple.status(), JobStatus::Running);
        assert_eq!(long.status(), JobStatus::Running);

        engine.stop();
        assert_eq!(simple.status(), JobStatus::Stopped);
        assert_eq!(long.status(), JobStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_is_not_kept() {
        let engine = SimpleIntervalEngine::new();
        let result = engine.add(SimpleIntervalJob::new(
            SimpleIntervalSchedule::new().milliseconds(MAX_TIMER_DURATION_MS),
            noop(),
        ));
        assert!(matches!(result, Err(SchedulerError::IntervalTooLong { .. })));
        assert!(engine.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readding_same_job_keeps_one_entry() {
        let engine = SimpleIntervalEngine::new();
        let job = Arc::new(SimpleIntervalJob::new(
            SimpleIntervalSchedule::new().seconds(1),
            noop(),
        ));

        engine.add(job.clone()).expect("first add");
        engine.add(job.clone()).expect("second add");
        assert_eq!(engine.len(), 1);
        assert_eq!(job.status(), JobStatus::Running);

        engine.stop();
        assert_eq!(job.status(), JobStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_by_id() {
        let engine = SimpleIntervalEngine::new();
        let job =
            SimpleIntervalJob::new(SimpleIntervalSchedule::new().seconds(1), noop()).with_id("a");
        engine.add(job).expect("add");

        assert!(engine.remove("missing").is_none());
        let removed = engine.remove("a").expect("removed");
        assert_eq!(removed.id(), Some("a"));
        assert!(engine.is_empty());
    }
}
