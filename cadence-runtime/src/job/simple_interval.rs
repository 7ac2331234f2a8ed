use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use super::{checked_period, Job, JobOptions, JobStatus};
use crate::error::SchedulerError;
use crate::schedule::SimpleIntervalSchedule;
use crate::task::JobTask;

/// Runs a task every `schedule.to_millis()` milliseconds.
///
/// The first tick lands one full period after `start`. Periods must be below
/// [`MAX_TIMER_DURATION_MS`](super::MAX_TIMER_DURATION_MS); longer ones need a
/// [`LongIntervalJob`](super::LongIntervalJob).
pub struct SimpleIntervalJob {
    id: Option<String>,
    schedule: SimpleIntervalSchedule,
    task: JobTask,
    prevent_overrun: bool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl SimpleIntervalJob {
    pub fn new(schedule: SimpleIntervalSchedule, task: impl Into<JobTask>) -> Self {
        Self::with_options(schedule, task, JobOptions::default())
    }

    pub fn with_options(
        schedule: SimpleIntervalSchedule,
        task: impl Into<JobTask>,
        options: JobOptions,
    ) -> Self {
        Self {
            id: options.id,
            schedule,
            task: task.into(),
            prevent_overrun: options.prevent_overrun,
            timer: Mutex::new(None),
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

    pub fn schedule(&self) -> &SimpleIntervalSchedule {
        &self.schedule
    }

    pub fn task(&self) -> &JobTask {
        &self.task
    }

    pub fn prevents_overrun(&self) -> bool {
        self.prevent_overrun
    }

    /// Arm the timer with its period counted from `anchor` instead of now.
    pub(crate) fn start_at(&self, anchor: Instant) -> Result<(), SchedulerError> {
        let millis = checked_period(&self.schedule)?;
        let runtime =
            Handle::try_current().map_err(|_| SchedulerError::NoRuntime(self.id.clone()))?;

        self.stop();

        if self.schedule.run_immediately {
            self.task.fire(self.id.as_deref(), anchor);
        }

        let ticker = spawn_ticker(
            &runtime,
            anchor,
            Duration::from_millis(millis),
            self.id.clone(),
            self.task.clone(),
            self.prevent_overrun,
        );
        if let Some(previous) = self.timer.lock().replace(ticker) {
            previous.abort();
        }
        debug!(
            job_id = ?self.id,
            task_id = %self.task.id(),
            period_ms = millis,
            "Interval job armed"
        );
        Ok(())
    }
}

fn spawn_ticker(
    runtime: &Handle,
    anchor: Instant,
    period: Duration,
    job_id: Option<String>,
    task: JobTask,
    prevent_overrun: bool,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut interval = time::interval_at(anchor + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let scheduled_at = interval.tick().await;
            if !task.try_fire(job_id.as_deref(), scheduled_at, prevent_overrun) {
                debug!(
                    job_id = ?job_id,
                    task_id = %task.id(),
                    "Previous execution still running, skipping tick"
                );
            }
        }
    })
}

impl Job for SimpleIntervalJob {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn start(&self) -> Result<(), SchedulerError> {
        self.start_at(Instant::now())
    }

    fn stop(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }

    fn status(&self) -> JobStatus {
        match self.timer.lock().as_ref() {
            Some(timer) if !timer.is_finished() => JobStatus::Running,
            _ => JobStatus::Stopped,
        }
    }
}

impl Drop for SimpleIntervalJob {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for SimpleIntervalJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleIntervalJob")
            .field("id", &self.id)
            .field("schedule", &self.schedule)
            .field("task", &self.task.id())
            .field("prevent_overrun", &self.prevent_overrun)
            .field("status", &self.status())
            .finish()
    }
}
