use cadence::{
    resolve_config_value, CronJob, CronSchedule, SchedulerBuilder, SimpleIntervalJob,
    SimpleIntervalSchedule, Task,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cadence_runtime=info".parse()?))
        .init();

    println!("🚀 Scheduler configured from demos/config/application.toml");
    println!("   Override with e.g. CADENCE_JOBS__HEARTBEAT__MILLISECONDS=250\n");

    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/config/application.toml");
    let scheduler = SchedulerBuilder::with_toml(path)?.build()?;
    let config = scheduler.config();

    println!("⚙️  Settings: {:?}", scheduler.settings());

    let heartbeat = SimpleIntervalSchedule::from_config(config, "jobs.heartbeat")?;
    scheduler.add_simple_interval_job(SimpleIntervalJob::with_options(
        heartbeat,
        Task::new("heartbeat", |_| {
            println!("[HEARTBEAT] ♥");
            Ok(())
        }),
        scheduler.job_options("heartbeat"),
    ))?;

    // Shorthand string with a placeholder default.
    let cleanup = SimpleIntervalSchedule::from_config(config, "app.cleanup_interval")?;
    scheduler.add_simple_interval_job(SimpleIntervalJob::with_options(
        cleanup,
        Task::new("cleanup", |_| {
            println!("[CLEANUP] Sweeping");
            Ok(())
        }),
        scheduler.job_options("cleanup"),
    ))?;

    // Runs in the configured default time zone.
    let nightly = resolve_config_value("${jobs.nightly.cron:0 0 3 * * *}", config)?;
    scheduler.add_cron_job(CronJob::with_options(
        CronSchedule::new(nightly),
        Task::new("nightly", |_| Ok(())),
        scheduler.job_options("nightly"),
    ))?;

    println!("✅ Jobs running: {:?}\n", scheduler.job_ids());
    tokio::time::sleep(Duration::from_secs(5)).await;
    scheduler.stop();

    Ok(())
}
