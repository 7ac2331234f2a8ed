use cadence::{AsyncTask, Scheduler, SimpleIntervalJob, SimpleIntervalSchedule, Task};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cadence_runtime=info".parse()?))
        .init();

    println!("🚀 Simple interval jobs: a fast sync task and a slow async task\n");

    let scheduler = Scheduler::new();

    let fast_count = Arc::new(AtomicU32::new(0));
    let counter = fast_count.clone();
    let fast = Task::new("fast", move |_| {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[FAST] Execution #{} (every 500ms)", count);
        Ok(())
    });
    scheduler.add_simple_interval_job(
        SimpleIntervalJob::new(SimpleIntervalSchedule::new().milliseconds(500), fast)
            .with_id("fast"),
    )?;

    // Takes 3s but is due every second; overlapping firings are skipped.
    let slow_count = Arc::new(AtomicU32::new(0));
    let counter = slow_count.clone();
    let slow = AsyncTask::new("slow", move |ctx| {
        let counter = counter.clone();
        async move {
            let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
            println!("[SLOW] Run #{} started at {}", count, ctx.fired_at);
            tokio::time::sleep(Duration::from_secs(3)).await;
            println!("[SLOW] Run #{} done", count);
            Ok(())
        }
    });
    scheduler.add_simple_interval_job(
        SimpleIntervalJob::new(
            SimpleIntervalSchedule::new().seconds(1).run_immediately(true),
            slow,
        )
        .with_id("slow")
        .with_prevent_overrun(true),
    )?;

    // A failing task never takes the job down.
    let flaky = Task::new("flaky", |_| Err(anyhow::anyhow!("upstream unavailable")))
        .with_error_handler(|err| {
            println!("[FLAKY] handled: {}", err);
            Ok(())
        });
    scheduler.add_simple_interval_job(
        SimpleIntervalJob::new(SimpleIntervalSchedule::new().seconds(2), flaky).with_id("flaky"),
    )?;

    println!("✅ Jobs running: {:?}\n", scheduler.job_ids());
    tokio::time::sleep(Duration::from_secs(10)).await;
    scheduler.stop();

    println!("\n📊 RESULTS after 10 seconds:");
    println!("   Fast task (500ms): {} executions", fast_count.load(Ordering::SeqCst));
    println!("   Expected: ~20 times (10000ms / 500ms)");
    println!("   Slow task (1s, 3s runtime): {} executions", slow_count.load(Ordering::SeqCst));
    println!("   Expected: ~3-4 times, overruns skipped");

    Ok(())
}
