//! Run observation
//!
//! Every fire resolves to exactly one observer event: started runs end
//! in completed or failed, dropped fires are reported as skipped with
//! their reason. The default [`TracingObserver`] logs through the
//! `tracing` crate; tests install recording observers instead.

use std::time::Duration;

use tracing::{info, warn};

use pontoon_core::Error;

use crate::job::RunOutput;

/// Why a fire was dropped without running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The job's previous run is still active
    Overlap,
    /// The global concurrency limit was saturated (skip policy)
    ConcurrencyLimit,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Overlap => write!(f, "overlapping run"),
            SkipReason::ConcurrencyLimit => write!(f, "concurrency limit reached"),
        }
    }
}

/// Observer for per-run scheduler events.
pub trait RunObserver: Send + Sync {
    /// A run began executing.
    fn on_started(&self, job: &str);

    /// A fire was dropped without running.
    fn on_skipped(&self, job: &str, reason: SkipReason);

    /// A run finished successfully.
    fn on_completed(&self, job: &str, output: &RunOutput, duration: Duration);

    /// A run finished with an error. The scheduler keeps serving the
    /// job's future fires regardless.
    fn on_failed(&self, job: &str, error: &Error, duration: Duration);
}

/// Observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RunObserver for NoOpObserver {
    fn on_started(&self, _job: &str) {}
    fn on_skipped(&self, _job: &str, _reason: SkipReason) {}
    fn on_completed(&self, _job: &str, _output: &RunOutput, _duration: Duration) {}
    fn on_failed(&self, _job: &str, _error: &Error, _duration: Duration) {}
}

/// Observer that logs run events via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_started(&self, job: &str) {
        info!("Run started for job {job}");
    }

    fn on_skipped(&self, job: &str, reason: SkipReason) {
        info!("Skipped fire for job {job}: {reason}");
    }

    fn on_completed(&self, job: &str, output: &RunOutput, duration: Duration) {
        match &output.manifest_id {
            Some(manifest_id) => info!(
                "Run for job {job} completed in {duration:?} (manifest {manifest_id})"
            ),
            None => info!("Run for job {job} completed in {duration:?}"),
        }
    }

    fn on_failed(&self, job: &str, error: &Error, duration: Duration) {
        warn!("Run for job {job} failed after {duration:?}: {error}");
    }
}
