use std::sync::Arc;

use tracing::debug;

use super::{JobList, SchedulerEngine};
use crate::cron_engine::CronEngine;
use crate::error::SchedulerError;
use crate::job::{CronJob, Job};

/// Runs cron jobs. Jobs without their own cron engine get this engine's.
pub struct CronJobEngine {
    cron_engine: Arc<dyn CronEngine>,
    jobs: JobList,
}

impl CronJobEngine {
    pub fn new(cron_engine: Arc<dyn CronEngine>) -> Self {
        Self {
            cron_engine,
            jobs: JobList::default(),
        }
    }

    pub fn cron_engine(&self) -> &Arc<dyn CronEngine> {
        &self.cron_engine
    }

    /// Start the job and keep it. A job that fails to start is not kept.
    pub fn add(&self, job: impl Into<Arc<CronJob>>) -> Result<Arc<dyn Job>, SchedulerError> {
        let job: Arc<CronJob> = job.into();
        job.bind_engine(&self.cron_engine);
        job.start()?;
        debug!(job_id = ?job.id(), "Cron job added to engine");
        let job: Arc<dyn Job> = job;
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

impl SchedulerEngine for CronJobEngine {
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
    use crate::cron_engine::ManualCronEngine;
    use crate::job::JobStatus;
    use crate::schedule::CronSchedule;
    use crate::task::Task;

    #[tokio::test]
    async fn test_binds_own_engine_and_stops_all() {
        let manual = ManualCronEngine::new();
        let engine = CronJobEngine::new(Arc::new(manual.clone()));
        let job = Arc::new(
            CronJob::new(CronSchedule::new("0 * * * * *"), Task::new("task", |_| Ok(())))
                .with_id("cron"),
        );

        engine.add(job.clone()).expect("add");
        assert_eq!(job.status(), JobStatus::Running);
        assert_eq!(manual.active(), 1);
        assert_eq!(engine.len(), 1);

        engine.stop();
        assert_eq!(job.status(), JobStatus::Stopped);
        assert_eq!(manual.active(), 0);
    }

    #[tokio::test]
    async fn test_job_keeps_its_own_engine() {
        let shared = ManualCronEngine::new();
        let own = ManualCronEngine::new();
        let engine = CronJobEngine::new(Arc::new(shared.clone()));

        engine
            .add(
                CronJob::new(CronSchedule::new("0 * * * * *"), Task::new("task", |_| Ok(())))
                    .with_cron_engine(Arc::new(own.clone())),
            )
            .expect("add");
        assert_eq!(shared.active(), 0);
        assert_eq!(own.active(), 1);
    }

    #[tokio::test]
    async fn test_invalid_job_is_not_kept() {
        let engine = CronJobEngine::new(Arc::new(ManualCronEngine::new()));
        let result = engine.add(CronJob::new(
            CronSchedule::new("0 * * * * *").with_timezone("Not/AZone"),
            Task::new("task", |_| Ok(())),
        ));
        assert!(matches!(result, Err(SchedulerError::InvalidTimezone(_))));
        assert!(engine.is_empty());
    }
}
