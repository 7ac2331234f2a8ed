//! Cron engines turn a cron expression into repeated callback invocations.
//!
//! Parsing cron fields and evaluating time zones is the engine's business;
//! [`CronJob`](crate::CronJob) only asks it to create and stop handles.

mod tokio_cron;

pub use tokio_cron::TokioCronEngine;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::Job as CronEntry;

use crate::error::SchedulerError;

/// Invoked by the engine on every firing. The returned future settles when
/// the execution it started does.
pub type CronCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub trait CronEngine: Send + Sync {
    /// Register `on_tick` to run whenever `expression` matches, evaluated in
    /// `timezone` (an IANA name) or the engine's default zone.
    fn create(
        &self,
        expression: &str,
        timezone: Option<&str>,
        on_tick: CronCallback,
    ) -> Result<Box<dyn CronHandle>, SchedulerError>;
}

pub trait CronHandle: Send + Sync {
    fn is_running(&self) -> bool;

    /// Stop firing. Calling it again does nothing.
    fn stop(&self);
}

/// Check an expression the way `tokio-cron-scheduler` parses it: six fields,
/// seconds first.
pub fn validate_cron_expression(expression: &str) -> Result<(), SchedulerError> {
    match CronEntry::new_async(expression, |_uuid, _lock| Box::pin(async {})) {
        Ok(_) => Ok(()),
        Err(e) => Err(SchedulerError::InvalidCron(format!("'{}': {}", expression, e))),
    }
}

/// Parse an IANA time zone name.
pub fn parse_timezone(name: &str) -> Result<chrono_tz::Tz, SchedulerError> {
    name.parse()
        .map_err(|_| SchedulerError::InvalidTimezone(name.to_string()))
}

/// Cron engine that fires only when told to.
///
/// Expressions and time zones are validated like [`TokioCronEngine`] does,
/// but nothing fires on its own: [`fire`](Self::fire) invokes every running
/// registration. Useful for tests and for driving cron jobs from an external
/// trigger.
#[derive(Clone, Default)]
pub struct ManualCronEngine {
    registrations: Arc<Mutex<Vec<Registration>>>,
}

struct Registration {
    expression: String,
    timezone: Option<String>,
    running: Arc<AtomicBool>,
    on_tick: CronCallback,
}

struct ManualHandle {
    running: Arc<AtomicBool>,
}

impl ManualCronEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every running registration now and spawn the resulting
    /// executions on the current runtime.
    ///
    /// Callbacks run before this returns, so overrun checks see the state of
    /// earlier firings.
    pub fn fire(&self) -> Vec<JoinHandle<()>> {
        let callbacks: Vec<CronCallback> = self
            .registrations
            .lock()
            .iter()
            .filter(|r| r.running.load(Ordering::SeqCst))
            .map(|r| r.on_tick.clone())
            .collect();
        callbacks
            .into_iter()
            .map(|on_tick| tokio::spawn(on_tick()))
            .collect()
    }

    /// Number of registrations that are still running.
    pub fn active(&self) -> usize {
        self.registrations
            .lock()
            .iter()
            .filter(|r| r.running.load(Ordering::SeqCst))
            .count()
    }

    /// Expressions and time zones of running registrations, in creation order.
    pub fn schedules(&self) -> Vec<(String, Option<String>)> {
        self.registrations
            .lock()
            .iter()
            .filter(|r| r.running.load(Ordering::SeqCst))
            .map(|r| (r.expression.clone(), r.timezone.clone()))
            .collect()
    }
}

impl CronEngine for ManualCronEngine {
    fn create(
        &self,
        expression: &str,
        timezone: Option<&str>,
        on_tick: CronCallback,
    ) -> Result<Box<dyn CronHandle>, SchedulerError> {
        validate_cron_expression(expression)?;
        if let Some(tz) = timezone {
            parse_timezone(tz)?;
        }

        let running = Arc::new(AtomicBool::new(true));
        let mut registrations = self.registrations.lock();
        registrations.retain(|r| r.running.load(Ordering::SeqCst));
        registrations.push(Registration {
            expression: expression.to_string(),
            timezone: timezone.map(str::to_string),
            running: running.clone(),
            on_tick,
        });
        Ok(Box::new(ManualHandle { running }))
    }
}

impl CronHandle for ManualHandle {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
