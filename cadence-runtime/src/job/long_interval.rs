//! Interval jobs whose period may exceed the timer limit.
//!
//! Periods below [`MAX_TIMER_DURATION_MS`] run on a plain
//! [`SimpleIntervalJob`]. Longer periods are "eaten" in legs: a child interval
//! job of at most `MAX_TIMER_DURATION_MS - 1` relays to the next leg until the
//! remaining time fits into one timer, and the final leg, sized exactly to the
//! remaining time, re-arms the next cycle and executes the task. All leg
//! arithmetic is done on scheduled tick instants, so cycles do not drift.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, error};

use super::{Job, JobOptions, JobStatus, SimpleIntervalJob, MAX_TIMER_DURATION_MS};
use crate::error::SchedulerError;
use crate::schedule::SimpleIntervalSchedule;
use crate::task::{JobTask, Task};

pub struct LongIntervalJob {
    id: Option<String>,
    schedule: SimpleIntervalSchedule,
    task: JobTask,
    prevent_overrun: bool,
    mode: Mutex<Option<Mode>>,
}

enum Mode {
    Direct(SimpleIntervalJob),
    Chained(Arc<TimeEater>),
}

impl LongIntervalJob {
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
            mode: Mutex::new(None),
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

    fn options(&self) -> JobOptions {
        JobOptions {
            id: self.id.clone(),
            prevent_overrun: self.prevent_overrun,
        }
    }
}

impl Job for LongIntervalJob {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn start(&self) -> Result<(), SchedulerError> {
        let period_ms = self.schedule.to_millis();
        if period_ms == 0 {
            return Err(SchedulerError::InvalidInterval(
                "interval must be at least 1ms".to_string(),
            ));
        }
        Handle::try_current().map_err(|_| SchedulerError::NoRuntime(self.id.clone()))?;

        self.stop();

        let mode = if period_ms < MAX_TIMER_DURATION_MS {
            let inner =
                SimpleIntervalJob::with_options(self.schedule, self.task.clone(), self.options());
            inner.start()?;
            Mode::Direct(inner)
        } else {
            let anchor = Instant::now();
            if self.schedule.run_immediately {
                self.task.fire(self.id.as_deref(), anchor);
            }
            let eater = TimeEater::new(self.options(), period_ms, self.task.clone());
            eater.arm(anchor)?;
            Mode::Chained(eater)
        };

        if let Some(previous) = self.mode.lock().replace(mode) {
            previous.stop();
        }
        Ok(())
    }

    fn stop(&self) {
        if let Some(mode) = self.mode.lock().take() {
            mode.stop();
        }
    }

    fn status(&self) -> JobStatus {
        match self.mode.lock().as_ref() {
            Some(Mode::Direct(inner)) => inner.status(),
            Some(Mode::Chained(eater)) => eater.status(),
            None => JobStatus::Stopped,
        }
    }
}

impl Mode {
    fn stop(&self) {
        match self {
            Mode::Direct(inner) => inner.stop(),
            Mode::Chained(eater) => eater.disarm(),
        }
    }
}

impl std::fmt::Debug for LongIntervalJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongIntervalJob")
            .field("id", &self.id)
            .field("schedule", &self.schedule)
            .field("task", &self.task.id())
            .field("prevent_overrun", &self.prevent_overrun)
            .field("status", &self.status())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    /// Another leg follows.
    Relay,
    /// The cycle ends when this leg elapses.
    Final,
}

/// Chain state of a long period. At most one child leg is live.
struct TimeEater {
    options: JobOptions,
    period: Duration,
    task: JobTask,
    state: Mutex<ChainState>,
}

struct ChainState {
    armed: bool,
    target: Instant,
    child: Option<SimpleIntervalJob>,
}

impl TimeEater {
    fn new(options: JobOptions, period_ms: u64, task: JobTask) -> Arc<Self> {
        Arc::new(Self {
            options,
            period: Duration::from_millis(period_ms),
            task,
            state: Mutex::new(ChainState {
                armed: false,
                target: Instant::now(),
                child: None,
            }),
        })
    }

    fn arm(self: &Arc<Self>, anchor: Instant) -> Result<(), SchedulerError> {
        let target = self.target_after(anchor)?;
        let mut state = self.state.lock();
        state.armed = true;
        state.target = target;
        self.arm_leg(&mut state, anchor)
    }

    fn disarm(&self) {
        let mut state = self.state.lock();
        state.armed = false;
        if let Some(child) = state.child.take() {
            child.stop();
        }
    }

    fn status(&self) -> JobStatus {
        let state = self.state.lock();
        match state.child.as_ref() {
            Some(child) if state.armed => child.status(),
            _ => JobStatus::Stopped,
        }
    }

    fn target_after(&self, anchor: Instant) -> Result<Instant, SchedulerError> {
        anchor.checked_add(self.period).ok_or_else(|| {
            SchedulerError::InvalidInterval(format!(
                "interval of {}ms cannot be represented",
                self.period.as_millis()
            ))
        })
    }

    /// Replace the live child with one that covers the next leg from `now`.
    fn arm_leg(
        self: &Arc<Self>,
        state: &mut ChainState,
        now: Instant,
    ) -> Result<(), SchedulerError> {
        let remaining = state.target.saturating_duration_since(now);
        let remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
        let (leg_ms, leg) = if remaining_ms >= MAX_TIMER_DURATION_MS {
            (MAX_TIMER_DURATION_MS - 1, Leg::Relay)
        } else {
            (remaining_ms, Leg::Final)
        };

        let child = SimpleIntervalJob::with_options(
            SimpleIntervalSchedule::new().milliseconds(leg_ms),
            self.relay_task(leg),
            JobOptions {
                id: self.options.id.clone(),
                prevent_overrun: false,
            },
        );
        child.start_at(now)?;
        if let Some(previous) = state.child.replace(child) {
            previous.stop();
        }

        debug!(
            job_id = ?self.options.id,
            leg = ?leg,
            leg_ms,
            remaining_ms,
            "Long interval leg armed"
        );
        Ok(())
    }

    fn relay_task(self: &Arc<Self>, leg: Leg) -> Task {
        let eater: Weak<TimeEater> = Arc::downgrade(self);
        Task::new(format!("{}:relay", self.task.id()), move |ctx| {
            if let Some(eater) = eater.upgrade() {
                eater.on_leg_elapsed(leg, ctx.scheduled_at);
            }
            Ok(())
        })
    }

    fn on_leg_elapsed(self: &Arc<Self>, leg: Leg, now: Instant) {
        let rearmed = {
            let mut state = self.state.lock();
            if !state.armed {
                return;
            }
            match leg {
                Leg::Relay => self.arm_leg(&mut state, now),
                Leg::Final => {
                    let anchor = state.target;
                    self.target_after(anchor).and_then(|target| {
                        state.target = target;
                        self.arm_leg(&mut state, anchor)
                    })
                }
            }
        };
        if let Err(err) = rearmed {
            error!(
                job_id = ?self.options.id,
                error = %err,
                "Failed to arm next long interval leg"
            );
        }

        if leg == Leg::Final {
            let fired = self.task.try_fire(
                self.options.id.as_deref(),
                now,
                self.options.prevent_overrun,
            );
            if !fired {
                debug!(
                    job_id = ?self.options.id,
                    task_id = %self.task.id(),
                    "Previous execution still running, skipping tick"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::AsyncTask;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOUR_MS: u64 = 3_600_000;

    async fn advance(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_hours(hours: u64) {
        for _ in 0..hours {
            advance(HOUR_MS).await;
        }
    }

    fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = counter.clone();
        Task::new("long task", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_period_runs_directly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let job = LongIntervalJob::new(
            SimpleIntervalSchedule::new().seconds(20),
            counting_task(&counter),
        );
        job.start().expect("start");

        advance(19_999).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        advance(1).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        job.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_period_beyond_timer_limit_repeats() {
        let counter = Arc::new(AtomicUsize::new(0));
        let job = LongIntervalJob::new(
            SimpleIntervalSchedule::new().days(25),
            counting_task(&counter),
        )
        .with_id("long");
        job.start().expect("start");
        assert_eq!(job.status(), JobStatus::Running);

        advance_hours(25 * 24 - 1).await;
        advance(HOUR_MS - 1).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(job.status(), JobStatus::Running);

        advance(1).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        advance_hours(25 * 24).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        job.stop();
        job.stop();
        assert_eq!(job.status(), JobStatus::Stopped);
        advance_hours(25 * 24).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_period_exactly_at_timer_limit() {
        let counter = Arc::new(AtomicUsize::new(0));
        let job = LongIntervalJob::new(
            SimpleIntervalSchedule::new().milliseconds(MAX_TIMER_DURATION_MS),
            counting_task(&counter),
        );
        job.start().expect("start");

        advance(MAX_TIMER_DURATION_MS - 1).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        advance(1).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        job.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_cycle() {
        let counter = Arc::new(AtomicUsize::new(0));
        let job = LongIntervalJob::new(
            SimpleIntervalSchedule::new().days(30),
            counting_task(&counter),
        );
        job.start().expect("start");

        advance_hours(24 * 26).await;
        job.stop();
        advance_hours(24 * 10).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_immediately_in_chained_mode() {
        let counter = Arc::new(AtomicUsize::new(0));
        let job = LongIntervalJob::new(
            SimpleIntervalSchedule::new().days(25).run_immediately(true),
            counting_task(&counter),
        );
        job.start().expect("start");
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        advance_hours(25 * 24).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        job.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_task_skips_cycle_but_chain_continues() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let task = AsyncTask::new("month-long", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(30 * 24 * 3600)).await;
                Ok(())
            }
        });
        let job = LongIntervalJob::new(SimpleIntervalSchedule::new().days(25), task)
            .with_prevent_overrun(true);
        job.start().expect("start");

        // Runs start on day 25 and 75. The day 50 cycle finds the first run,
        // which lasts until day 55, still in flight.
        advance_hours(25 * 24).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        advance_hours(25 * 24).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(job.status(), JobStatus::Running);
        advance_hours(25 * 24).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(job.status(), JobStatus::Running);
        job.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_rejected() {
        let counter = Arc::new(AtomicUsize::new(0));
        let job = LongIntervalJob::new(SimpleIntervalSchedule::new(), counting_task(&counter));
        assert!(matches!(job.start(), Err(SchedulerError::InvalidInterval(_))));
        assert_eq!(job.status(), JobStatus::Stopped);
    }
}
