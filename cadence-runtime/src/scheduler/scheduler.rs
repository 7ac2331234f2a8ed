use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use config::Config;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::SchedulerSettings;
use crate::cron_engine::{CronEngine, TokioCronEngine};
use crate::engine::{CronJobEngine, IntervalJob, SchedulerEngine, SimpleIntervalEngine};
use crate::error::SchedulerError;
use crate::job::{CronJob, Job, JobOptions, LongIntervalJob, SimpleIntervalJob};

/// Which engine owns a registered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineKind {
    Interval,
    Cron,
}

struct Entry {
    job: Arc<dyn Job>,
    engine: EngineKind,
}

/// Registry of jobs by id.
///
/// Adding a job hands it to the engine for its kind, which starts it. Jobs
/// without an id run but are not tracked by id. Engines are created on first
/// use, so stopping a scheduler that never ran a job of some kind is fine.
pub struct Scheduler {
    config: Arc<Config>,
    settings: SchedulerSettings,
    cron_engine: Arc<dyn CronEngine>,
    interval_engine: OnceLock<SimpleIntervalEngine>,
    cron_job_engine: OnceLock<CronJobEngine>,
    jobs: RwLock<HashMap<String, Entry>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Scheduler with default settings and a [`TokioCronEngine`] in UTC.
    pub fn new() -> Self {
        Self::from_parts(
            Arc::new(Config::default()),
            SchedulerSettings::default(),
            Arc::new(TokioCronEngine::new()),
        )
    }

    pub(crate) fn from_parts(
        config: Arc<Config>,
        settings: SchedulerSettings,
        cron_engine: Arc<dyn CronEngine>,
    ) -> Self {
        Self {
            config,
            settings,
            cron_engine,
            interval_engine: OnceLock::new(),
            cron_job_engine: OnceLock::new(),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Options for a new job, with the configured overrun policy.
    pub fn job_options(&self, id: impl Into<String>) -> JobOptions {
        JobOptions::new()
            .id(id)
            .prevent_overrun(self.settings.prevent_overrun)
    }

    pub fn add_simple_interval_job(
        &self,
        job: impl Into<Arc<SimpleIntervalJob>>,
    ) -> Result<(), SchedulerError> {
        self.add_interval_job(IntervalJob::Simple(job.into()))
    }

    pub fn add_long_interval_job(
        &self,
        job: impl Into<Arc<LongIntervalJob>>,
    ) -> Result<(), SchedulerError> {
        self.add_interval_job(IntervalJob::Long(job.into()))
    }

    /// Add either kind of interval job.
    pub fn add_interval_job(&self, job: impl Into<IntervalJob>) -> Result<(), SchedulerError> {
        let job = job.into();
        let id = job.id().map(str::to_string);
        let handle = job.clone().into_job();
        self.register(id.as_deref(), handle, EngineKind::Interval, || {
            self.interval_engine
                .get_or_init(SimpleIntervalEngine::new)
                .add(job)
                .map(drop)
        })
    }

    pub fn add_cron_job(&self, job: impl Into<Arc<CronJob>>) -> Result<(), SchedulerError> {
        let job: Arc<CronJob> = job.into();
        let id = job.id().map(str::to_string);
        let handle: Arc<dyn Job> = job.clone();
        self.register(id.as_deref(), handle, EngineKind::Cron, || {
            self.cron_job_engine
                .get_or_init(|| CronJobEngine::new(self.cron_engine.clone()))
                .add(job)
                .map(drop)
        })
    }

    /// Reserve the id, then let the engine start the job. The reservation is
    /// released again when the start fails.
    fn register(
        &self,
        id: Option<&str>,
        job: Arc<dyn Job>,
        engine: EngineKind,
        start: impl FnOnce() -> Result<(), SchedulerError>,
    ) -> Result<(), SchedulerError> {
        if let Some(id) = id {
            let mut jobs = self.jobs.write();
            if jobs.contains_key(id) {
                return Err(SchedulerError::DuplicateJobId(id.to_string()));
            }
            jobs.insert(id.to_string(), Entry { job, engine });
        }

        if let Err(e) = start() {
            if let Some(id) = id {
                self.jobs.write().remove(id);
            }
            warn!(job_id = ?id, error = %e, "Failed to start job");
            return Err(e);
        }

        info!(job_id = ?id, engine = ?engine, "Job scheduled");
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Arc<dyn Job>, SchedulerError> {
        self.jobs
            .read()
            .get(id)
            .map(|entry| entry.job.clone())
            .ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))
    }

    pub fn exists_by_id(&self, id: &str) -> bool {
        self.jobs.read().contains_key(id)
    }

    /// Ids of every tracked job, sorted.
    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop the job and forget it. Returns `None` when no job has this id.
    pub fn remove_by_id(&self, id: &str) -> Option<Arc<dyn Job>> {
        let entry = self.jobs.write().remove(id)?;
        entry.job.stop();
        if let Some(engine) = self.engine(entry.engine) {
            engine.remove(id);
        }
        info!(job_id = %id, "Job removed");
        Some(entry.job)
    }

    pub fn stop_by_id(&self, id: &str) -> Result<(), SchedulerError> {
        self.get_by_id(id)?.stop();
        info!(job_id = %id, "Job stopped");
        Ok(())
    }

    pub fn start_by_id(&self, id: &str) -> Result<(), SchedulerError> {
        self.get_by_id(id)?.start()?;
        info!(job_id = %id, "Job started");
        Ok(())
    }

    /// Stop every job of every engine that has been used.
    pub fn stop(&self) {
        for kind in [EngineKind::Interval, EngineKind::Cron] {
            if let Some(engine) = self.engine(kind) {
                engine.stop();
            }
        }
        info!("Scheduler stopped");
    }

    fn engine(&self, kind: EngineKind) -> Option<&dyn SchedulerEngine> {
        match kind {
            EngineKind::Interval => self
                .interval_engine
                .get()
                .map(|engine| engine as &dyn SchedulerEngine),
            EngineKind::Cron => self
                .cron_job_engine
                .get()
                .map(|engine| engine as &dyn SchedulerEngine),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("settings", &self.settings)
            .field("jobs", &self.job_ids())
            .finish()
    }
}
