use cadence::{
    AsyncTask, CronJob, CronSchedule, Job, JobStatus, ManualCronEngine, Scheduler,
    SchedulerBuilder, SchedulerError, Task, CRON_EVERY_HOUR, CRON_EVERY_MINUTE,
    CRON_EVERY_SECOND,
};
use config::{Config, File, FileFormat};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

fn manual_scheduler() -> (Scheduler, ManualCronEngine) {
    let engine = ManualCronEngine::new();
    let scheduler = SchedulerBuilder::new()
        .with_cron_engine(Arc::new(engine.clone()))
        .build()
        .expect("build");
    (scheduler, engine)
}

async fn fire(engine: &ManualCronEngine) {
    for handle in engine.fire() {
        handle.await.expect("join");
    }
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn counting_task(id: &str, counter: &Arc<AtomicUsize>) -> Task {
    let counter = counter.clone();
    Task::new(id, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

/// Async task that holds its run open until `gate` hands out a permit.
fn gated_task(id: &str, gate: &Arc<Semaphore>, started: &Arc<AtomicUsize>) -> AsyncTask {
    let gate = gate.clone();
    let started = started.clone();
    AsyncTask::new(id, move |_| {
        let gate = gate.clone();
        let started = started.clone();
        async move {
            started.fetch_add(1, Ordering::SeqCst);
            gate.acquire().await?.forget();
            Ok(())
        }
    })
}

#[tokio::test]
async fn test_cron_job_fires_through_engine() {
    let (scheduler, engine) = manual_scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler
        .add_cron_job(
            CronJob::new(
                CronSchedule::new(CRON_EVERY_MINUTE).with_timezone("Europe/Berlin"),
                counting_task("minutely", &counter),
            )
            .with_id("minutely"),
        )
        .expect("add");

    assert_eq!(
        engine.schedules(),
        vec![(
            CRON_EVERY_MINUTE.to_string(),
            Some("Europe/Berlin".to_string())
        )]
    );

    fire(&engine).await;
    fire(&engine).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    scheduler.stop();
    assert_eq!(engine.active(), 0);
    fire(&engine).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cron_overrun_skips_firing_while_busy() {
    let (scheduler, engine) = manual_scheduler();
    let gate = Arc::new(Semaphore::new(0));
    let guarded = Arc::new(AtomicUsize::new(0));
    let unguarded = Arc::new(AtomicUsize::new(0));

    scheduler
        .add_cron_job(
            CronJob::new(
                CronSchedule::new(CRON_EVERY_SECOND),
                gated_task("guarded", &gate, &guarded),
            )
            .with_id("guarded")
            .with_prevent_overrun(true),
        )
        .expect("add guarded");
    scheduler
        .add_cron_job(
            CronJob::new(
                CronSchedule::new(CRON_EVERY_SECOND),
                gated_task("unguarded", &gate, &unguarded),
            )
            .with_id("unguarded")
            .with_prevent_overrun(false),
        )
        .expect("add unguarded");

    let mut in_flight = engine.fire();
    in_flight.extend(engine.fire());
    settle().await;
    assert_eq!(guarded.load(Ordering::SeqCst), 1);
    assert_eq!(unguarded.load(Ordering::SeqCst), 2);

    gate.add_permits(3);
    for handle in in_flight {
        handle.await.expect("join");
    }

    // The guarded run has settled, so the next firing goes through.
    gate.add_permits(2);
    fire(&engine).await;
    assert_eq!(guarded.load(Ordering::SeqCst), 2);
    assert_eq!(unguarded.load(Ordering::SeqCst), 3);

    scheduler.stop();
}

#[tokio::test]
async fn test_invalid_cron_input_is_rejected() {
    let (scheduler, engine) = manual_scheduler();
    let counter = Arc::new(AtomicUsize::new(0));

    let err = scheduler
        .add_cron_job(
            CronJob::new(CronSchedule::new("every day"), counting_task("bad", &counter))
                .with_id("bad"),
        )
        .expect_err("invalid expression");
    assert!(matches!(err, SchedulerError::InvalidCron(_)));
    assert!(!scheduler.exists_by_id("bad"));

    let err = scheduler
        .add_cron_job(
            CronJob::new(
                CronSchedule::new(CRON_EVERY_HOUR).with_timezone("Mars/Olympus"),
                counting_task("bad", &counter),
            )
            .with_id("bad"),
        )
        .expect_err("invalid timezone");
    assert!(matches!(err, SchedulerError::InvalidTimezone(_)));
    assert!(!scheduler.exists_by_id("bad"));
    assert_eq!(engine.active(), 0);
}

#[tokio::test]
async fn test_remove_and_restart_cron_job() {
    let (scheduler, engine) = manual_scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler
        .add_cron_job(
            CronJob::new(CronSchedule::new(CRON_EVERY_HOUR), counting_task("hourly", &counter))
                .with_id("hourly"),
        )
        .expect("add");

    scheduler.stop_by_id("hourly").expect("stop");
    let job: Arc<dyn Job> = scheduler.get_by_id("hourly").expect("registered");
    assert_eq!(job.status(), JobStatus::Stopped);
    fire(&engine).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    scheduler.start_by_id("hourly").expect("start");
    assert_eq!(job.status(), JobStatus::Running);
    fire(&engine).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let removed = scheduler.remove_by_id("hourly").expect("removed");
    assert_eq!(removed.status(), JobStatus::Stopped);
    assert!(!scheduler.exists_by_id("hourly"));
    fire(&engine).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_settings_seed_job_options() {
    let config = Config::builder()
        .add_source(File::from_str(
            "[scheduler]\nprevent_overrun = false",
            FileFormat::Toml,
        ))
        .build()
        .expect("config");
    let engine = ManualCronEngine::new();
    let scheduler = SchedulerBuilder::with_config(config)
        .with_cron_engine(Arc::new(engine.clone()))
        .build()
        .expect("build");

    let gate = Arc::new(Semaphore::new(0));
    let started = Arc::new(AtomicUsize::new(0));
    scheduler
        .add_cron_job(CronJob::with_options(
            CronSchedule::new(CRON_EVERY_SECOND),
            gated_task("overlapping", &gate, &started),
            scheduler.job_options("overlapping"),
        ))
        .expect("add");
    assert!(scheduler.exists_by_id("overlapping"));

    let mut in_flight = engine.fire();
    in_flight.extend(engine.fire());
    settle().await;
    assert_eq!(started.load(Ordering::SeqCst), 2);

    gate.add_permits(2);
    for handle in in_flight {
        handle.await.expect("join");
    }
    scheduler.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tokio_cron_engine_runs_cron_jobs() {
    let scheduler = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler
        .add_cron_job(
            CronJob::new(
                CronSchedule::new(CRON_EVERY_SECOND).with_timezone("UTC"),
                counting_task("every-second", &counter),
            )
            .with_id("every-second"),
        )
        .expect("add");

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(counter.load(Ordering::SeqCst) >= 1);

    scheduler.stop();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let after_stop = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), after_stop);
}
