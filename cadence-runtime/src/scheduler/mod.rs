mod builder;
mod scheduler;

pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
