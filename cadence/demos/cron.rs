use cadence::{
    AsyncTask, CronJob, CronSchedule, Scheduler, Task, CRON_EVERY_30_SECONDS, CRON_EVERY_SECOND,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cadence_runtime=info".parse()?))
        .init();

    println!("🚀 Cron jobs on the tokio-cron-scheduler engine\n");

    let scheduler = Scheduler::new();

    let every_second = Task::new("every-second", |ctx| {
        println!("[CRON] Every second at {}", ctx.fired_at);
        Ok(())
    });
    scheduler.add_cron_job(
        CronJob::new(CronSchedule::new(CRON_EVERY_SECOND), every_second).with_id("every-second"),
    )?;

    // Takes 5s but fires every 2s; overlapping firings are skipped.
    let slow = AsyncTask::new("slow-cron", |_| async {
        println!("[SLOW-CRON] Started");
        tokio::time::sleep(Duration::from_secs(5)).await;
        println!("[SLOW-CRON] Finished");
        Ok(())
    });
    scheduler.add_cron_job(
        CronJob::new(CronSchedule::new("*/2 * * * * *"), slow)
            .with_id("slow-cron")
            .with_prevent_overrun(true),
    )?;

    let tokyo = Task::new("tokyo", |_| {
        println!("[TOKYO] Half minute in Asia/Tokyo");
        Ok(())
    });
    scheduler.add_cron_job(
        CronJob::new(
            CronSchedule::new(CRON_EVERY_30_SECONDS).with_timezone("Asia/Tokyo"),
            tokyo,
        )
        .with_id("tokyo"),
    )?;

    println!("✅ Jobs running: {:?}\n", scheduler.job_ids());
    tokio::time::sleep(Duration::from_secs(12)).await;

    scheduler.remove_by_id("every-second");
    println!("\n🗑  Removed every-second, remaining: {:?}", scheduler.job_ids());
    tokio::time::sleep(Duration::from_secs(4)).await;

    scheduler.stop();
    Ok(())
}
