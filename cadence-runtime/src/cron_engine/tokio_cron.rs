use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono_tz::Tz;
use futures::future;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Mutex as AsyncMutex;
use tokio_cron_scheduler::{Job as CronEntry, JobScheduler};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{parse_timezone, CronCallback, CronEngine, CronHandle};
use crate::config::SchedulerSettings;
use crate::error::SchedulerError;

type SharedScheduler = Arc<AsyncMutex<Option<JobScheduler>>>;

/// [`CronEngine`] backed by `tokio-cron-scheduler`.
///
/// One `JobScheduler` is created and started on the first registration and
/// shared by every cron job created through this engine. Expressions use six
/// fields, seconds first.
#[derive(Clone)]
pub struct TokioCronEngine {
    default_timezone: Tz,
    scheduler: SharedScheduler,
}

impl Default for TokioCronEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioCronEngine {
    pub fn new() -> Self {
        Self::with_timezone(Tz::UTC)
    }

    /// Evaluate schedules without an explicit time zone in `timezone`.
    pub fn with_timezone(timezone: Tz) -> Self {
        Self {
            default_timezone: timezone,
            scheduler: Arc::new(AsyncMutex::new(None)),
        }
    }

    pub fn from_settings(settings: &SchedulerSettings) -> Result<Self, SchedulerError> {
        Ok(Self::with_timezone(settings.parse_timezone()?))
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_timezone
    }

    /// Shut the underlying `JobScheduler` down. A later registration starts a
    /// fresh one.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        let scheduler = self.scheduler.lock().await.take();
        if let Some(mut scheduler) = scheduler {
            scheduler.shutdown().await?;
            info!("Cron scheduler shut down");
        }
        Ok(())
    }

    async fn running_scheduler(slot: &SharedScheduler) -> Result<JobScheduler, SchedulerError> {
        let mut guard = slot.lock().await;
        if let Some(scheduler) = guard.as_ref() {
            return Ok(scheduler.clone());
        }
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        info!("Cron scheduler started");
        *guard = Some(scheduler.clone());
        Ok(scheduler)
    }
}

impl CronEngine for TokioCronEngine {
    fn create(
        &self,
        expression: &str,
        timezone: Option<&str>,
        on_tick: CronCallback,
    ) -> Result<Box<dyn CronHandle>, SchedulerError> {
        let tz = match timezone {
            Some(name) => parse_timezone(name)?,
            None => self.default_timezone,
        };

        let running = Arc::new(AtomicBool::new(true));
        let firing = running.clone();
        let entry = CronEntry::new_async_tz(expression, tz, move |_uuid, _lock| {
            if firing.load(Ordering::SeqCst) {
                on_tick()
            } else {
                future::ready(()).boxed()
            }
        })
        .map_err(|e| SchedulerError::InvalidCron(format!("'{}': {}", expression, e)))?;

        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime(None))?;
        let registered: Arc<parking_lot::Mutex<Option<Uuid>>> = Arc::default();

        let slot = self.scheduler.clone();
        let still_running = running.clone();
        let registered_uuid = registered.clone();
        let cron = expression.to_string();
        runtime.spawn(async move {
            let scheduler = match Self::running_scheduler(&slot).await {
                Ok(scheduler) => scheduler,
                Err(e) => {
                    error!(cron = %cron, error = %e, "Failed to start cron scheduler");
                    still_running.store(false, Ordering::SeqCst);
                    return;
                }
            };
            match scheduler.add(entry).await {
                Ok(uuid) => {
                    *registered_uuid.lock() = Some(uuid);
                    info!(cron = %cron, uuid = %uuid, timezone = %tz.name(), "Cron job registered");
                    // Stopped while the registration was in flight.
                    if !still_running.load(Ordering::SeqCst) {
                        remove_entry(&scheduler, uuid).await;
                    }
                }
                Err(e) => {
                    error!(cron = %cron, error = %e, "Failed to register cron job");
                    still_running.store(false, Ordering::SeqCst);
                }
            }
        });

        Ok(Box::new(TokioCronHandle {
            running,
            registered,
            scheduler: self.scheduler.clone(),
            runtime,
        }))
    }
}

struct TokioCronHandle {
    running: Arc<AtomicBool>,
    registered: Arc<parking_lot::Mutex<Option<Uuid>>>,
    scheduler: SharedScheduler,
    runtime: Handle,
}

impl CronHandle for TokioCronHandle {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let Some(uuid) = self.registered.lock().take() else {
            return;
        };
        let slot = self.scheduler.clone();
        self.runtime.spawn(async move {
            let scheduler = slot.lock().await.clone();
            if let Some(scheduler) = scheduler {
                remove_entry(&scheduler, uuid).await;
            }
        });
    }
}

async fn remove_entry(scheduler: &JobScheduler, uuid: Uuid) {
    match scheduler.remove(&uuid).await {
        Ok(()) => debug!(uuid = %uuid, "Cron job removed"),
        Err(e) => debug!(uuid = %uuid, error = %e, "Cron job already gone"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_callback(counter: &Arc<AtomicUsize>) -> CronCallback {
        let counter = counter.clone();
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            future::ready(()).boxed()
        })
    }

    #[test]
    fn test_invalid_expression_rejected() {
        let engine = TokioCronEngine::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let result = engine.create("invalid", None, counting_callback(&counter));
        assert!(matches!(result, Err(SchedulerError::InvalidCron(_))));
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let engine = TokioCronEngine::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let result = engine.create("0 0 * * * *", Some("Invalid/Zone"), counting_callback(&counter));
        assert!(matches!(result, Err(SchedulerError::InvalidTimezone(_))));
    }

    #[test]
    fn test_settings_timezone_becomes_default() {
        let settings = SchedulerSettings {
            default_timezone: "Asia/Tokyo".to_string(),
            ..SchedulerSettings::default()
        };
        let engine = TokioCronEngine::from_settings(&settings).unwrap();
        assert_eq!(engine.default_timezone(), chrono_tz::Asia::Tokyo);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fires_every_second_until_stopped() {
        let engine = TokioCronEngine::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = engine
            .create(crate::schedule::CRON_EVERY_SECOND, Some("UTC"), counting_callback(&counter))
            .unwrap();
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(counter.load(Ordering::SeqCst) >= 1);

        handle.stop();
        handle.stop();
        assert!(!handle.is_running());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);

        engine.shutdown().await.unwrap();
        engine.shutdown().await.unwrap();
    }
}
