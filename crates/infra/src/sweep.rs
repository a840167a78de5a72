//! Periodic re-estimation sweep.
//!
//! Keeps `estimated_days_remaining` fresh as time passes without new usage.
//! The scheduler is an explicit service: the composition root constructs it,
//! calls `start()` and, on shutdown, `stop()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ServiceResult;
use crate::ledger::InventoryLedger;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: usize,
    pub updated: usize,
    pub failed: usize,
    /// The run stopped early because the scheduler was stopped.
    pub cancelled: bool,
}

/// Work performed by one sweep run.
#[async_trait]
pub trait SweepJob: Send + Sync + 'static {
    /// Best-effort: per-item failures are counted, not returned. `cancel` is
    /// checked between items.
    async fn run(&self, today: NaiveDate, cancel: &AtomicBool) -> ServiceResult<SweepReport>;
}

#[async_trait]
impl SweepJob for InventoryLedger {
    async fn run(&self, today: NaiveDate, cancel: &AtomicBool) -> ServiceResult<SweepReport> {
        let started_at = Utc::now();
        let targets = self.tracked_fragrances().await?;

        let mut report = SweepReport {
            started_at,
            finished_at: started_at,
            processed: 0,
            updated: 0,
            failed: 0,
            cancelled: false,
        };

        for fragrance_id in targets {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }
            report.processed += 1;
            match self.estimate(fragrance_id, today).await {
                Ok(_) => report.updated += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(%fragrance_id, error = %e, "sweep: re-estimation failed");
                }
            }
        }

        report.finished_at = Utc::now();
        Ok(report)
    }
}

/// When the first scheduled run happens.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FirstRun {
    AtLocalMidnight,
    After(Duration),
}

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub first_run: FirstRun,
    pub period: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            first_run: FirstRun::AtLocalMidnight,
            period: DAY,
        }
    }
}

struct Running {
    shutdown: Arc<Notify>,
    cancel: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

/// State shared by the timer loop and on-demand runs.
struct SweepRunner {
    job: Arc<dyn SweepJob>,
    // At most one sweep at a time, scheduled or on demand.
    gate: AsyncMutex<()>,
    last_report: Mutex<Option<SweepReport>>,
}

impl SweepRunner {
    async fn run_once(&self, today: NaiveDate, cancel: &AtomicBool) -> ServiceResult<SweepReport> {
        let _gate = self.gate.lock().await;
        let report = self.job.run(today, cancel).await?;
        info!(
            processed = report.processed,
            updated = report.updated,
            failed = report.failed,
            cancelled = report.cancelled,
            "sweep finished"
        );
        if let Ok(mut last) = self.last_report.lock() {
            *last = Some(report.clone());
        }
        Ok(report)
    }
}

pub struct SweepScheduler {
    runner: Arc<SweepRunner>,
    config: SweepConfig,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for SweepScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepScheduler")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl SweepScheduler {
    pub fn new(job: Arc<dyn SweepJob>, config: SweepConfig) -> Self {
        Self {
            runner: Arc::new(SweepRunner {
                job,
                gate: AsyncMutex::new(()),
                last_report: Mutex::new(None),
            }),
            config,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|r| r.as_ref().is_some_and(|r| !r.join.is_finished()))
            .unwrap_or(false)
    }

    /// Report of the most recent finished sweep, scheduled or on demand.
    pub fn last_report(&self) -> Option<SweepReport> {
        self.runner.last_report.lock().ok().and_then(|r| r.clone())
    }

    /// Spawn the timer loop on the current tokio runtime.
    ///
    /// Returns `false` if it is already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock().unwrap_or_else(|p| p.into_inner());
        if running.is_some() {
            return false;
        }

        let shutdown = Arc::new(Notify::new());
        let cancel = Arc::new(AtomicBool::new(false));

        let first_delay = match self.config.first_run {
            FirstRun::AtLocalMidnight => until_next_midnight(Local::now()),
            FirstRun::After(d) => d,
        };

        let join = tokio::spawn(sweep_loop(
            self.runner.clone(),
            first_delay,
            self.config.period,
            shutdown.clone(),
            cancel.clone(),
        ));

        *running = Some(Running {
            shutdown,
            cancel,
            join,
        });
        true
    }

    /// Run a sweep now and wait for its report.
    ///
    /// Works whether or not the timer loop is running. Waits for an
    /// in-flight scheduled sweep instead of overlapping it.
    pub async fn trigger(&self, today: NaiveDate) -> ServiceResult<SweepReport> {
        let never_cancelled = AtomicBool::new(false);
        self.runner.run_once(today, &never_cancelled).await
    }

    /// Stop the loop, interrupting an in-flight run between items.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        let Some(running) = running else {
            return;
        };

        running.cancel.store(true, Ordering::Relaxed);
        running.shutdown.notify_one();
        if let Err(e) = running.join.await {
            warn!(error = %e, "sweep scheduler task ended abnormally");
        }
    }
}

async fn sweep_loop(
    runner: Arc<SweepRunner>,
    first_delay: Duration,
    period: Duration,
    shutdown: Arc<Notify>,
    cancel: Arc<AtomicBool>,
) {
    info!(first_run_in_secs = first_delay.as_secs(), "sweep scheduler started");
    let mut next_tick = Instant::now() + first_delay;

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = tokio::time::sleep_until(next_tick) => {
                // Keep a stable cadence even if we were delayed.
                let now = Instant::now();
                while next_tick <= now {
                    next_tick += period;
                }
                debug!("scheduled sweep due");
            }
        }

        let today = Local::now().date_naive();
        if let Err(e) = runner.run_once(today, &cancel).await {
            warn!(error = %e, "sweep could not list tracked fragrances");
        }

        if cancel.load(Ordering::Relaxed) {
            break;
        }
    }

    info!("sweep scheduler stopped");
}

/// Time from `now` until the next midnight in `now`'s time zone.
///
/// Falls back to a full day when that midnight does not exist locally.
pub fn until_next_midnight<Tz: TimeZone>(now: DateTime<Tz>) -> Duration {
    let Some(midnight) = now
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return DAY;
    };

    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(next) => next
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(DAY),
        None => DAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl SweepJob for CountingJob {
        async fn run(&self, _today: NaiveDate, _cancel: &AtomicBool) -> ServiceResult<SweepReport> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            let now = Utc::now();
            Ok(SweepReport {
                started_at: now,
                finished_at: now,
                processed: n,
                updated: n,
                failed: 0,
                cancelled: false,
            })
        }
    }

    fn scheduler(job: Arc<CountingJob>, first_run: FirstRun) -> SweepScheduler {
        SweepScheduler::new(
            job,
            SweepConfig {
                first_run,
                period: Duration::from_secs(3600),
            },
        )
    }

    async fn wait_for_runs(job: &CountingJob, n: usize) {
        for _ in 0..200 {
            if job.runs.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("sweep did not run {n} time(s)");
    }

    #[test]
    fn midnight_is_computed_in_the_given_zone() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 22, 30, 0).unwrap();
        assert_eq!(until_next_midnight(now), Duration::from_secs(90 * 60));

        let just_after = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 1).unwrap();
        assert_eq!(until_next_midnight(just_after), DAY - Duration::from_secs(1));
    }

    #[tokio::test]
    async fn trigger_works_without_the_timer_and_records_report() {
        let job = Arc::new(CountingJob::default());
        let sched = scheduler(job.clone(), FirstRun::After(Duration::from_secs(3600)));

        let report = sched.trigger(Utc::now().date_naive()).await.unwrap();
        assert_eq!(report.processed, 1);
        assert!(!sched.is_running());
        assert_eq!(sched.last_report(), Some(report));
    }

    #[derive(Default)]
    struct SlowJob {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl SweepJob for SlowJob {
        async fn run(&self, _today: NaiveDate, _cancel: &AtomicBool) -> ServiceResult<SweepReport> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            let at = Utc::now();
            Ok(SweepReport {
                started_at: at,
                finished_at: at,
                processed: 0,
                updated: 0,
                failed: 0,
                cancelled: false,
            })
        }
    }

    #[tokio::test]
    async fn on_demand_runs_never_overlap() {
        let job = Arc::new(SlowJob::default());
        let sched = SweepScheduler::new(job.clone(), SweepConfig::default());
        let today = Utc::now().date_naive();

        let (a, b) = tokio::join!(sched.trigger(today), sched.trigger(today));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let job = Arc::new(CountingJob::default());
        let sched = scheduler(job, FirstRun::After(Duration::from_secs(3600)));
        assert!(sched.start());
        assert!(!sched.start());
        sched.stop().await;
        assert!(!sched.is_running());
    }

    #[tokio::test]
    async fn first_scheduled_run_fires_after_delay() {
        let job = Arc::new(CountingJob::default());
        let sched = scheduler(job.clone(), FirstRun::After(Duration::from_millis(10)));
        sched.start();
        wait_for_runs(&job, 1).await;
        sched.stop().await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let job = Arc::new(CountingJob::default());
        let sched = scheduler(job, FirstRun::After(Duration::from_secs(3600)));
        sched.start();
        sched.stop().await;
        sched.stop().await;
        assert!(!sched.is_running());
    }
}
