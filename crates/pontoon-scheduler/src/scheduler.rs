//! The scheduler proper

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use pontoon_core::config::{OverflowPolicy, RuntimeConfig};
use pontoon_core::{Error, Result};

use crate::job::{Job, JobRunner, JobState};
use crate::observer::{RunObserver, SkipReason, TracingObserver};

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently running jobs
    pub max_concurrent_jobs: usize,

    /// What to do with fires beyond the limit
    pub overflow: OverflowPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            overflow: OverflowPolicy::Skip,
        }
    }
}

impl From<&RuntimeConfig> for SchedulerConfig {
    fn from(runtime: &RuntimeConfig) -> Self {
        Self {
            max_concurrent_jobs: runtime.max_concurrent_jobs,
            overflow: runtime.overflow,
        }
    }
}

struct SchedulerContext {
    config: SchedulerConfig,
    observer: Arc<dyn RunObserver>,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

#[derive(Clone)]
struct Registered {
    state: Arc<JobState>,
    runner: Arc<dyn JobRunner>,
}

/// Clears the job's running flag when the run resolves, on every path.
struct RunningGuard(Arc<JobState>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// Cron-driven scheduler owning the job list and all run state.
///
/// All mutable scheduling state lives behind this explicit context, so
/// multiple schedulers can coexist in one process (and in tests).
pub struct Scheduler {
    ctx: Arc<SchedulerContext>,
    jobs: Mutex<HashMap<String, Registered>>,
    started: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler reporting through the default
    /// [`TracingObserver`].
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Create a scheduler with a custom run observer.
    pub fn with_observer(config: SchedulerConfig, observer: Arc<dyn RunObserver>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            ctx: Arc::new(SchedulerContext {
                config,
                observer,
                semaphore,
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
            }),
            jobs: Mutex::new(HashMap::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Register a job and the runner its fires invoke.
    pub fn register(&self, job: Job, runner: Arc<dyn JobRunner>) -> Result<()> {
        let mut jobs = self.jobs.lock().expect("scheduler lock poisoned");
        if jobs.contains_key(&job.name) {
            return Err(Error::invalid_config(format!(
                "job {} is already registered",
                job.name
            )));
        }

        debug!("Registered {} job {} ({})", job.role, job.name, job.cron);
        jobs.insert(
            job.name.clone(),
            Registered {
                state: Arc::new(JobState::new(job)),
                runner,
            },
        );
        Ok(())
    }

    /// Start one timer task per registered job. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let jobs = self.jobs.lock().expect("scheduler lock poisoned");
        for registered in jobs.values() {
            let ctx = self.ctx.clone();
            let registered = registered.clone();
            self.ctx.tracker.spawn(timer_loop(ctx, registered));
        }
        info!("Scheduler started with {} jobs", jobs.len());
    }

    /// Fire a job immediately, outside its schedule.
    ///
    /// Subject to the same running-flag and concurrency rules as a cron
    /// fire; used by one-shot commands and tests.
    pub fn trigger(&self, name: &str) -> Result<()> {
        let jobs = self.jobs.lock().expect("scheduler lock poisoned");
        let registered = jobs
            .get(name)
            .ok_or_else(|| Error::invalid_config(format!("no job named {name}")))?;
        fire(&self.ctx, registered);
        Ok(())
    }

    /// Stop the scheduler: cancel every pending fire and in-flight run,
    /// then wait for all tasks to unwind. Terminal.
    pub async fn stop(&self) {
        info!("Stopping scheduler");
        self.ctx.cancel.cancel();
        self.ctx.tracker.close();
        self.ctx.tracker.wait().await;
        info!("Scheduler stopped");
    }

    /// Whether the named job currently has an active run.
    pub fn is_running(&self, name: &str) -> bool {
        self.jobs
            .lock()
            .expect("scheduler lock poisoned")
            .get(name)
            .map(|r| r.state.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// The last manifest id the named job completed successfully with.
    pub fn last_successful_manifest(&self, name: &str) -> Option<String> {
        self.jobs
            .lock()
            .expect("scheduler lock poisoned")
            .get(name)
            .and_then(|r| {
                r.state
                    .last_success
                    .read()
                    .expect("job state lock poisoned")
                    .clone()
            })
    }
}

async fn timer_loop(ctx: Arc<SchedulerContext>, registered: Registered) {
    let job_name = registered.state.job.name.clone();

    loop {
        let Some(next) = registered.state.job.next_fire() else {
            warn!("Job {job_name} has no upcoming fire; timer exiting");
            return;
        };

        let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        debug!("Job {job_name} sleeping {delay:?} until {next}");

        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                debug!("Timer for job {job_name} cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => fire(&ctx, &registered),
        }
    }
}

/// Handle one fire: drop it if the job is already running, otherwise
/// spawn the run on its own task so the timer loop never blocks.
fn fire(ctx: &Arc<SchedulerContext>, registered: &Registered) {
    let state = registered.state.clone();

    if state.running.swap(true, Ordering::SeqCst) {
        ctx.observer.on_skipped(&state.job.name, SkipReason::Overlap);
        return;
    }
    let guard = RunningGuard(state.clone());

    let ctx = ctx.clone();
    let runner = registered.runner.clone();

    ctx.tracker.clone().spawn(async move {
        let _guard = guard;

        let _permit = match ctx.config.overflow {
            OverflowPolicy::Skip => match ctx.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    ctx.observer
                        .on_skipped(&state.job.name, SkipReason::ConcurrencyLimit);
                    return;
                }
            },
            OverflowPolicy::Queue => {
                tokio::select! {
                    _ = ctx.cancel.cancelled() => return,
                    permit = ctx.semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                }
            }
        };

        ctx.observer.on_started(&state.job.name);
        let start = Instant::now();

        match runner.run(&state.job, ctx.cancel.child_token()).await {
            Ok(output) => {
                if let Some(manifest_id) = &output.manifest_id {
                    *state
                        .last_success
                        .write()
                        .expect("job state lock poisoned") = Some(manifest_id.clone());
                }
                ctx.observer
                    .on_completed(&state.job.name, &output, start.elapsed());
            }
            Err(error) => {
                ctx.observer
                    .on_failed(&state.job.name, &error, start.elapsed());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobRole, RunOutput};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    struct FakeRunner {
        delay: Duration,
        fail: bool,
        runs: Arc<AtomicU32>,
    }

    impl FakeRunner {
        fn new(delay: Duration) -> (Arc<Self>, Arc<AtomicU32>) {
            let runs = Arc::new(AtomicU32::new(0));
            (
                Arc::new(Self {
                    delay,
                    fail: false,
                    runs: runs.clone(),
                }),
                runs,
            )
        }

        fn failing() -> (Arc<Self>, Arc<AtomicU32>) {
            let runs = Arc::new(AtomicU32::new(0));
            (
                Arc::new(Self {
                    delay: Duration::ZERO,
                    fail: true,
                    runs: runs.clone(),
                }),
                runs,
            )
        }
    }

    #[async_trait]
    impl JobRunner for FakeRunner {
        async fn run(&self, job: &Job, _cancel: CancellationToken) -> Result<RunOutput> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::stream_interrupted("simulated failure"));
            }
            Ok(RunOutput {
                manifest_id: Some(format!("manifest-for-{}", job.name)),
            })
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl RunObserver for RecordingObserver {
        fn on_started(&self, job: &str) {
            self.events.lock().unwrap().push(format!("started:{job}"));
        }
        fn on_skipped(&self, job: &str, reason: SkipReason) {
            self.events
                .lock()
                .unwrap()
                .push(format!("skipped:{job}:{reason}"));
        }
        fn on_completed(&self, job: &str, _output: &RunOutput, _duration: Duration) {
            self.events.lock().unwrap().push(format!("completed:{job}"));
        }
        fn on_failed(&self, job: &str, error: &Error, _duration: Duration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("failed:{job}:{error}"));
        }
    }

    fn job(name: &str) -> Job {
        // A schedule that never fires during a test.
        Job::new(name, JobRole::Dump, "0 0 1 1 *").unwrap()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within timeout");
    }

    #[tokio::test]
    async fn test_trigger_runs_job_and_records_success() {
        let observer = Arc::new(RecordingObserver::default());
        let scheduler = Scheduler::with_observer(SchedulerConfig::default(), observer.clone());
        let (runner, runs) = FakeRunner::new(Duration::ZERO);

        scheduler.register(job("alpha"), runner).unwrap();
        scheduler.trigger("alpha").unwrap();

        wait_until(|| runs.load(Ordering::SeqCst) == 1).await;
        wait_until(|| !scheduler.is_running("alpha")).await;

        assert_eq!(
            scheduler.last_successful_manifest("alpha").as_deref(),
            Some("manifest-for-alpha")
        );
        let events = observer.events();
        assert!(events.contains(&"started:alpha".to_string()));
        assert!(events.contains(&"completed:alpha".to_string()));
    }

    #[tokio::test]
    async fn test_overlapping_fire_is_skipped() {
        let observer = Arc::new(RecordingObserver::default());
        let scheduler = Scheduler::with_observer(SchedulerConfig::default(), observer.clone());
        let (runner, runs) = FakeRunner::new(Duration::from_millis(200));

        scheduler.register(job("alpha"), runner).unwrap();
        scheduler.trigger("alpha").unwrap();
        wait_until(|| scheduler.is_running("alpha")).await;
        scheduler.trigger("alpha").unwrap();

        wait_until(|| !scheduler.is_running("alpha")).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1, "exactly one run may execute");
        assert!(observer
            .events()
            .contains(&"skipped:alpha:overlapping run".to_string()));
    }

    #[tokio::test]
    async fn test_failed_run_leaves_job_schedulable() {
        let observer = Arc::new(RecordingObserver::default());
        let scheduler = Scheduler::with_observer(SchedulerConfig::default(), observer.clone());
        let (runner, runs) = FakeRunner::failing();

        scheduler.register(job("alpha"), runner).unwrap();

        scheduler.trigger("alpha").unwrap();
        wait_until(|| runs.load(Ordering::SeqCst) == 1).await;
        wait_until(|| !scheduler.is_running("alpha")).await;

        scheduler.trigger("alpha").unwrap();
        wait_until(|| runs.load(Ordering::SeqCst) == 2).await;
        wait_until(|| !scheduler.is_running("alpha")).await;

        let failures = observer
            .events()
            .iter()
            .filter(|e| e.starts_with("failed:alpha"))
            .count();
        assert_eq!(failures, 2);
        assert!(scheduler.last_successful_manifest("alpha").is_none());
    }

    #[tokio::test]
    async fn test_concurrency_limit_skip_policy() {
        let observer = Arc::new(RecordingObserver::default());
        let config = SchedulerConfig {
            max_concurrent_jobs: 1,
            overflow: OverflowPolicy::Skip,
        };
        let scheduler = Scheduler::with_observer(config, observer.clone());

        let (slow_runner, slow_runs) = FakeRunner::new(Duration::from_millis(200));
        let (other_runner, other_runs) = FakeRunner::new(Duration::ZERO);
        scheduler.register(job("alpha"), slow_runner).unwrap();
        scheduler.register(job("beta"), other_runner).unwrap();

        scheduler.trigger("alpha").unwrap();
        wait_until(|| {
            observer
                .events()
                .contains(&"started:alpha".to_string())
        })
        .await;
        scheduler.trigger("beta").unwrap();

        wait_until(|| !scheduler.is_running("beta")).await;
        assert_eq!(other_runs.load(Ordering::SeqCst), 0);
        assert!(observer
            .events()
            .contains(&"skipped:beta:concurrency limit reached".to_string()));

        wait_until(|| slow_runs.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_concurrency_limit_queue_policy() {
        let config = SchedulerConfig {
            max_concurrent_jobs: 1,
            overflow: OverflowPolicy::Queue,
        };
        let scheduler = Scheduler::new(config);

        let (slow_runner, slow_runs) = FakeRunner::new(Duration::from_millis(100));
        let (queued_runner, queued_runs) = FakeRunner::new(Duration::ZERO);
        scheduler.register(job("alpha"), slow_runner).unwrap();
        scheduler.register(job("beta"), queued_runner).unwrap();

        scheduler.trigger("alpha").unwrap();
        wait_until(|| scheduler.is_running("alpha")).await;
        scheduler.trigger("beta").unwrap();

        // Queued, not dropped: beta runs once alpha releases the slot.
        wait_until(|| queued_runs.load(Ordering::SeqCst) == 1).await;
        assert_eq!(slow_runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_cancels_pending_fires_promptly() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let (runner, runs) = FakeRunner::new(Duration::ZERO);

        // Yearly schedule: the timer would sleep for months.
        scheduler.register(job("alpha"), runner).unwrap();
        scheduler.start();

        let stopped = tokio::time::timeout(Duration::from_secs(1), scheduler.stop()).await;
        assert!(stopped.is_ok(), "stop must cancel sleeping timers");
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_waits_for_inflight_run() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let (runner, runs) = FakeRunner::new(Duration::from_millis(100));

        scheduler.register(job("alpha"), runner).unwrap();
        scheduler.start();
        scheduler.trigger("alpha").unwrap();
        wait_until(|| scheduler.is_running("alpha")).await;

        scheduler.stop().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1, "stop drains in-flight runs");
        assert!(!scheduler.is_running("alpha"));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let (runner, _runs) = FakeRunner::new(Duration::ZERO);

        scheduler.register(job("alpha"), runner.clone()).unwrap();
        let err = scheduler.register(job("alpha"), runner).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_trigger_unknown_job_rejected() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        assert!(scheduler.trigger("ghost").is_err());
    }
}
