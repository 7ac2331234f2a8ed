//! Engines start the jobs handed to them and stop them all on shutdown.

mod cron;
mod simple_interval;

pub use cron::CronJobEngine;
pub use simple_interval::{IntervalJob, SimpleIntervalEngine};

use std::sync::Arc;

use parking_lot::RwLock;

use crate::job::Job;

/// What the registry needs from every engine.
pub trait SchedulerEngine: Send + Sync {
    /// Stop every job, in the order they were added.
    fn stop(&self);

    /// Forget the job registered under `id` without stopping it.
    fn remove(&self, id: &str) -> Option<Arc<dyn Job>>;

    fn jobs(&self) -> Vec<Arc<dyn Job>>;
}

/// Ordered jobs owned by an engine.
#[derive(Default)]
struct JobList {
    jobs: RwLock<Vec<Arc<dyn Job>>>,
}

impl JobList {
    /// Re-adding a job that is already listed keeps its single entry.
    fn push(&self, job: Arc<dyn Job>) {
        let mut jobs = self.jobs.write();
        if !jobs.iter().any(|existing| Arc::ptr_eq(existing, &job)) {
            jobs.push(job);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Job>> {
        self.jobs.read().clone()
    }

    fn stop_all(&self) {
        for job in self.snapshot() {
            job.stop();
        }
    }

    fn remove(&self, id: &str) -> Option<Arc<dyn Job>> {
        let mut jobs = self.jobs.write();
        let index = jobs.iter().position(|job| job.id() == Some(id))?;
        Some(jobs.remove(index))
    }
}
