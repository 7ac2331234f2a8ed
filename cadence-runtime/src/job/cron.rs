use std::sync::Arc;

use futures::future;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use super::{Job, JobOptions, JobStatus};
use crate::cron_engine::{CronCallback, CronEngine, CronHandle};
use crate::error::SchedulerError;
use crate::schedule::CronSchedule;
use crate::task::JobTask;

/// Runs a task whenever a cron expression matches.
///
/// Firing is driven by a [`CronEngine`]. Bind one with
/// [`with_cron_engine`](Self::with_cron_engine), or let the
/// [`CronJobEngine`](crate::CronJobEngine) bind its own when the job is added.
pub struct CronJob {
    id: Option<String>,
    schedule: CronSchedule,
    task: JobTask,
    prevent_overrun: bool,
    engine: RwLock<Option<Arc<dyn CronEngine>>>,
    handle: Mutex<Option<Box<dyn CronHandle>>>,
}

impl CronJob {
    pub fn new(schedule: CronSchedule, task: impl Into<JobTask>) -> Self {
        Self::with_options(schedule, task, JobOptions::default())
    }

    pub fn with_options(
        schedule: CronSchedule,
        task: impl Into<JobTask>,
        options: JobOptions,
    ) -> Self {
        Self {
            id: options.id,
            schedule,
            task: task.into(),
            prevent_overrun: options.prevent_overrun,
            engine: RwLock::new(None),
            handle: Mutex::new(None),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_prevent_overrun(mut self, prevent_overrun: bool) -> Self {
        self.prevent_overrun = prevent_overrun;
        self
    }

    pub fn with_cron_engine(mut self, engine: Arc<dyn CronEngine>) -> Self {
        *self.engine.get_mut() = Some(engine);
        self
    }

    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }

    pub fn task(&self) -> &JobTask {
        &self.task
    }

    /// Use `engine` unless one is already bound. Returns whether it was bound.
    pub(crate) fn bind_engine(&self, engine: &Arc<dyn CronEngine>) -> bool {
        let mut slot = self.engine.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(engine.clone());
        true
    }

    fn on_tick(&self) -> CronCallback {
        let task = self.task.clone();
        let job_id = self.id.clone();
        let prevent_overrun = self.prevent_overrun;
        Arc::new(move || {
            match task.try_launch(job_id.as_deref(), Instant::now(), prevent_overrun) {
                Some(execution) => execution,
                None => {
                    debug!(
                        job_id = ?job_id,
                        task_id = %task.id(),
                        "Previous execution still running, skipping cron firing"
                    );
                    future::ready(()).boxed()
                }
            }
        })
    }
}

impl Job for CronJob {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn start(&self) -> Result<(), SchedulerError> {
        let engine = self
            .engine
            .read()
            .clone()
            .ok_or_else(|| SchedulerError::NoCronEngine(self.id.clone()))?;

        self.stop();

        let handle = engine.create(
            &self.schedule.cron_expression,
            self.schedule.timezone.as_deref(),
            self.on_tick(),
        )?;
        if let Some(previous) = self.handle.lock().replace(handle) {
            previous.stop();
        }
        debug!(
            job_id = ?self.id,
            cron = %self.schedule.cron_expression,
            timezone = ?self.schedule.timezone,
            "Cron job armed"
        );
        Ok(())
    }

    fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.stop();
        }
    }

    fn status(&self) -> JobStatus {
        match self.handle.lock().as_ref() {
            Some(handle) if handle.is_running() => JobStatus::Running,
            _ => JobStatus::Stopped,
        }
    }
}

impl std::fmt::Debug for CronJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronJob")
            .field("id", &self.id)
            .field("schedule", &self.schedule)
            .field("task", &self.task.id())
            .field("prevent_overrun", &self.prevent_overrun)
            .field("status", &self.status())
            .finish()
    }
}
