//! Jobs and their runners

use std::sync::atomic::AtomicBool;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio_util::sync::CancellationToken;

use pontoon_core::schedule::parse_schedule;
use pontoon_core::Result;

/// Which pipeline a job's fires invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRole {
    /// Dump a source database into the bridge
    Dump,
    /// Restore a bridge artifact into a destination database
    Restore,
}

impl std::fmt::Display for JobRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobRole::Dump => write!(f, "dump"),
            JobRole::Restore => write!(f, "restore"),
        }
    }
}

/// A schedule bound to a pipeline invocation.
#[derive(Debug, Clone)]
pub struct Job {
    /// Job name, unique within a scheduler
    pub name: String,

    /// Which pipeline the job drives
    pub role: JobRole,

    /// The cron expression as configured
    pub cron: String,

    schedule: Schedule,
}

impl Job {
    /// Create a job, parsing and validating its cron expression.
    pub fn new(name: impl Into<String>, role: JobRole, cron: impl Into<String>) -> Result<Self> {
        let cron = cron.into();
        let schedule = parse_schedule(&cron)?;
        Ok(Self {
            name: name.into(),
            role,
            cron,
            schedule,
        })
    }

    /// The next fire time after now, in UTC.
    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.schedule.after(&Utc::now()).next()
    }
}

/// Per-job mutable state owned by the scheduler.
///
/// The running flag is the only concurrently mutated field; it is what
/// drops overlapping fires for the same job.
#[derive(Debug)]
pub(crate) struct JobState {
    pub(crate) job: Job,
    pub(crate) running: AtomicBool,
    pub(crate) last_success: RwLock<Option<String>>,
}

impl JobState {
    pub(crate) fn new(job: Job) -> Self {
        Self {
            job,
            running: AtomicBool::new(false),
            last_success: RwLock::new(None),
        }
    }
}

/// What a completed run reports back to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// Manifest the run produced (dump) or applied (restore), if any
    pub manifest_id: Option<String>,
}

/// The work a job's fires invoke.
///
/// Implementations wrap a pipeline plus the connector construction for
/// one configured job. The cancellation token is cancelled when the
/// scheduler stops; runners are expected to unwind promptly and leave
/// no `complete` artifact behind for an interrupted run.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Execute one run of the job.
    async fn run(&self, job: &Job, cancel: CancellationToken) -> Result<RunOutput>;
}
