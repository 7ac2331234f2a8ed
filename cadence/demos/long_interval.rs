use cadence::{
    Job, LongIntervalJob, Scheduler, SchedulerError, SimpleIntervalJob, SimpleIntervalSchedule,
    Task,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cadence_runtime=debug".parse()?))
        .init();

    println!("🚀 Intervals longer than a single timer\n");

    let scheduler = Scheduler::new();
    let monthly = SimpleIntervalSchedule::new().days(30);

    let task = Task::new("monthly-report", |ctx| {
        println!("[MONTHLY] Report for job {:?}", ctx.job_id);
        Ok(())
    });

    // A simple job refuses periods past the timer limit.
    match scheduler.add_simple_interval_job(
        SimpleIntervalJob::new(monthly, Task::new("too-long", |_| Ok(()))).with_id("too-long"),
    ) {
        Err(SchedulerError::IntervalTooLong { millis, max }) => {
            println!("❌ SimpleIntervalJob rejected {}ms (limit {}ms)", millis, max);
        }
        other => println!("unexpected result: {:?}", other),
    }

    // A long interval job chains timers to cover the whole period.
    scheduler.add_long_interval_job(
        LongIntervalJob::new(monthly.run_immediately(true), task).with_id("monthly-report"),
    )?;

    let job = scheduler.get_by_id("monthly-report")?;
    println!("✅ {:?} is {}", job.id(), job.status());

    scheduler.stop_by_id("monthly-report")?;
    println!("⏹  {:?} is {}", job.id(), job.status());

    Ok(())
}
