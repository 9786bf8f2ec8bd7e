//! Cron-driven scheduler
//!
//! One timer task per registered job, each firing on its cron schedule
//! (UTC). A fire never blocks the timer loop: runs execute on their own
//! tasks, guarded by a per-job running flag (overlapping fires for the
//! same job are dropped, not queued) and a global concurrency limit
//! (overflow policy configurable: skip or queue). Run outcomes are
//! reported as discrete events through a [`RunObserver`]; a failing run
//! never takes the scheduler down.

mod job;
mod observer;
mod scheduler;

pub use job::{Job, JobRole, JobRunner, RunOutput};
pub use observer::{NoOpObserver, RunObserver, SkipReason, TracingObserver};
pub use scheduler::{Scheduler, SchedulerConfig};
