use super::timers::TimerArena;
use crate::core::status::ThrottledTask;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Fetch groups for the one-time staged startup.
#[derive(Clone, Default)]
pub struct StagePlan {
    /// Fetched concurrently, first.
    pub first_paint: Vec<Arc<ThrottledTask>>,
    /// Each batch fetched concurrently, batches one after another.
    pub medium: Vec<Vec<Arc<ThrottledTask>>>,
    /// Fetched one at a time.
    pub sequential: Vec<Arc<ThrottledTask>>,
}

pub type HygieneHook = Arc<dyn Fn() + Send + Sync>;

struct Session {
    token: CancellationToken,
    tick: JoinHandle<()>,
    hygiene: Option<JoinHandle<()>>,
}

/// Drives registered tasks on a fixed tick.
///
/// Tasks are attempted in registration order every tick; their fetches run
/// detached, so a slow fetch never holds up the next tick.
pub struct TaskScheduler {
    tasks: Arc<RwLock<Vec<Arc<ThrottledTask>>>>,
    period: Duration,
    hygiene: Option<(Duration, HygieneHook)>,
    timers: Arc<TimerArena>,
    session: Mutex<Option<Session>>,
    ticks: Arc<AtomicU64>,
    init_started: AtomicBool,
    init_complete: AtomicBool,
    suspended: AtomicBool,
    disposed: AtomicBool,
}

impl TaskScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(Vec::new())),
            period,
            hygiene: None,
            timers: Arc::new(TimerArena::new()),
            session: Mutex::new(None),
            ticks: Arc::new(AtomicU64::new(0)),
            init_started: AtomicBool::new(false),
            init_complete: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Periodic housekeeping that runs while the scheduler is running and
    /// staged init has completed.
    pub fn with_hygiene<F>(mut self, interval: Duration, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hygiene = Some((interval, Arc::new(hook)));
        self
    }

    pub fn register(&self, task: Arc<ThrottledTask>) {
        if let Ok(mut tasks) = self.tasks.write() {
            debug!(target: "azenith::monitor", "Registered task {} (every {}ms)", task.key(), task.interval().as_millis());
            tasks.push(task);
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.session.lock() {
            Ok(s) if s.is_some() => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn timers(&self) -> &Arc<TimerArena> {
        &self.timers
    }

    pub fn is_initialized(&self) -> bool {
        self.init_complete.load(Ordering::Acquire)
    }

    /// `Stopped -> Running`. No-op when already running or disposed.
    pub fn start(&self) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }
        let Ok(mut session) = self.session.lock() else {
            return false;
        };
        if session.is_some() {
            debug!(target: "azenith::monitor", "Scheduler already running");
            return false;
        }

        let token = CancellationToken::new();
        let tick = tokio::spawn(tick_loop(
            self.tasks.clone(),
            self.period,
            token.clone(),
            self.ticks.clone(),
        ));
        let hygiene = if self.is_initialized() {
            self.hygiene
                .as_ref()
                .map(|(every, hook)| tokio::spawn(hygiene_loop(*every, hook.clone(), token.clone())))
        } else {
            None
        };

        *session = Some(Session {
            token,
            tick,
            hygiene,
        });
        info!(target: "azenith::monitor", "Scheduler running (tick {}ms)", self.period.as_millis());
        true
    }

    /// `Running -> Stopped`: cancels the tick, the hygiene hook and every
    /// pending deferred timer. No-op when already stopped.
    pub fn stop(&self) -> bool {
        let Some(session) = self.session.lock().ok().and_then(|mut s| s.take()) else {
            return false;
        };

        session.token.cancel();
        session.tick.abort();
        if let Some(hygiene) = session.hygiene {
            hygiene.abort();
        }
        let cancelled = self.timers.cancel_all();
        info!(target: "azenith::monitor", "Scheduler stopped ({} timers cancelled)", cancelled);
        true
    }

    /// Background transition. Also cancels timers left over from a staged
    /// init that is still running.
    pub fn suspend(&self) {
        self.suspended.store(true, Ordering::Release);
        self.stop();
        self.timers.cancel_all();
    }

    /// Foreground transition. Until staged init has completed the start is
    /// left to `heavy_init`.
    pub fn resume(&self) -> bool {
        self.suspended.store(false, Ordering::Release);
        if !self.is_initialized() {
            debug!(target: "azenith::monitor", "Resume before staged init finished, deferring start");
            return false;
        }
        self.start()
    }

    /// Terminal stop; later `start` calls are ignored.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.suspend();
    }

    /// Runs the three startup stages, then starts the scheduler. Only the
    /// first call does anything.
    pub async fn heavy_init(&self, plan: &StagePlan) -> bool {
        if self.init_started.swap(true, Ordering::AcqRel) {
            debug!(target: "azenith::monitor", "Staged init already ran");
            return false;
        }

        let started = Instant::now();
        info!(
            target: "azenith::monitor",
            "Staged init: {} first-paint, {} medium batches, {} sequential",
            plan.first_paint.len(),
            plan.medium.len(),
            plan.sequential.len()
        );

        let _ = join_all(plan.first_paint.iter().map(|t| t.run_now())).await;
        for batch in &plan.medium {
            let _ = join_all(batch.iter().map(|t| t.run_now())).await;
        }
        for task in &plan.sequential {
            let _ = task.run_now().await;
        }

        self.init_complete.store(true, Ordering::Release);
        info!(target: "azenith::monitor", "Staged init finished in {}ms", started.elapsed().as_millis());

        if self.suspended.load(Ordering::Acquire) {
            debug!(target: "azenith::monitor", "Hidden during staged init, not starting");
        } else {
            self.start();
        }
        true
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(
    tasks: Arc<RwLock<Vec<Arc<ThrottledTask>>>>,
    period: Duration,
    token: CancellationToken,
    ticks: Arc<AtomicU64>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                ticks.fetch_add(1, Ordering::AcqRel);
                let snapshot: Vec<Arc<ThrottledTask>> =
                    tasks.read().map(|t| t.clone()).unwrap_or_default();
                let now = Instant::now();
                for task in &snapshot {
                    let _ = task.maybe_run(now);
                }
            }
        }
    }
    debug!(target: "azenith::monitor", "Tick loop exited");
}

async fn hygiene_loop(every: Duration, hook: HygieneHook, token: CancellationToken) {
    let mut interval = time::interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => hook(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::StatusCache;
    use std::sync::atomic::AtomicUsize;

    fn counting(key: &str, interval: Duration) -> (Arc<ThrottledTask>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let task = ThrottledTask::new(key, interval, StatusCache::new(), move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, anyhow::Error>("ok".to_string()) }
        });
        (Arc::new(task), calls)
    }

    /// Task that records the peak number of concurrently running fetches.
    fn tracked(key: &str, active: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> Arc<ThrottledTask> {
        let (active, peak) = (active.clone(), peak.clone());
        Arc::new(ThrottledTask::new(key, Duration::ZERO, StatusCache::new(), move || {
            let (active, peak) = (active.clone(), peak.clone());
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>("done".to_string())
            }
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_are_idempotent() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert_eq!(scheduler.state(), SchedulerState::Running);

        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticking_until_next_start() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        let (task, calls) = counting("service", Duration::ZERO);
        scheduler.register(task);

        scheduler.start();
        time::sleep(Duration::from_millis(3500)).await;
        let seen = calls.load(Ordering::SeqCst);
        assert!(seen >= 3, "expected at least 3 fetches, got {}", seen);

        scheduler.stop();
        let ticks = scheduler.ticks();
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
        assert_eq!(scheduler.ticks(), ticks);

        scheduler.start();
        time::sleep(Duration::from_millis(1500)).await;
        assert!(calls.load(Ordering::SeqCst) > seen);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_respects_task_interval() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        let (task, calls) = counting("profile", Duration::from_secs(5));
        scheduler.register(task);

        scheduler.start();
        time::sleep(Duration::from_millis(9500)).await;
        scheduler.stop();

        // t=0 and t=5
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn heavy_init_runs_once_across_cycles() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        let (kernel, kernel_calls) = counting("kernel", Duration::ZERO);
        let plan = StagePlan {
            first_paint: vec![],
            medium: vec![vec![kernel]],
            sequential: vec![],
        };

        assert!(scheduler.heavy_init(&plan).await);
        assert_eq!(scheduler.state(), SchedulerState::Running);

        for _ in 0..3 {
            scheduler.suspend();
            assert!(scheduler.resume());
            assert!(!scheduler.heavy_init(&plan).await);
        }
        assert_eq!(kernel_calls.load(Ordering::SeqCst), 1);
        assert!(scheduler.is_initialized());
    }

    #[tokio::test(start_paused = true)]
    async fn stages_bound_concurrency() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        let active = Arc::new(AtomicUsize::new(0));
        let first_peak = Arc::new(AtomicUsize::new(0));
        let seq_peak = Arc::new(AtomicUsize::new(0));

        let plan = StagePlan {
            first_paint: vec![
                tracked("profile", &active, &first_peak),
                tracked("service", &active, &first_peak),
                tracked("soc", &active, &first_peak),
            ],
            medium: vec![],
            sequential: vec![
                tracked("dnd", &active, &seq_peak),
                tracked("jit", &active, &seq_peak),
                tracked("toast", &active, &seq_peak),
            ],
        };
        scheduler.heavy_init(&plan).await;

        assert_eq!(first_peak.load(Ordering::SeqCst), 3);
        assert_eq!(seq_peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_deferred_timers() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        let fired = Arc::new(AtomicBool::new(false));
        let f = fired.clone();

        scheduler.start();
        scheduler.timers().schedule(Duration::from_secs(5), async move {
            f.store(true, Ordering::SeqCst);
        });
        scheduler.stop();

        time::sleep(Duration::from_secs(10)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert_eq!(scheduler.timers().pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hygiene_runs_only_after_init_and_while_running() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let scheduler = TaskScheduler::new(Duration::from_secs(1))
            .with_hygiene(Duration::from_secs(15), move || {
                h.fetch_add(1, Ordering::SeqCst);
            });

        scheduler.start();
        time::sleep(Duration::from_secs(40)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        scheduler.stop();

        scheduler.heavy_init(&StagePlan::default()).await;
        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        scheduler.suspend();
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_during_init_stays_stopped_until_resume() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        let slow = Arc::new(ThrottledTask::new("resolution", Duration::ZERO, StatusCache::new(), || async {
            time::sleep(Duration::from_secs(1)).await;
            Ok::<_, anyhow::Error>("1080x2400".to_string())
        }));
        let plan = StagePlan {
            sequential: vec![slow],
            ..StagePlan::default()
        };

        tokio::join!(scheduler.heavy_init(&plan), async {
            time::sleep(Duration::from_millis(100)).await;
            scheduler.suspend();
            assert!(!scheduler.resume());
            scheduler.suspend();
        });
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        assert!(scheduler.resume());
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_before_init_waits_for_staged_init() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        let (kernel, kernel_calls) = counting("kernel", Duration::ZERO);
        let plan = StagePlan {
            medium: vec![vec![kernel]],
            ..StagePlan::default()
        };

        scheduler.suspend();
        assert!(!scheduler.resume());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.ticks(), 0);

        assert!(scheduler.heavy_init(&plan).await);
        assert_eq!(kernel_calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn heavy_init_keeps_earlier_deferred_work() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        let fired = Arc::new(AtomicBool::new(false));
        let f = fired.clone();

        scheduler.timers().schedule(Duration::from_millis(500), async move {
            f.store(true, Ordering::SeqCst);
        });
        scheduler.heavy_init(&StagePlan::default()).await;

        time::sleep(Duration::from_secs(1)).await;
        assert!(fired.load(Ordering::SeqCst));
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn disposed_scheduler_does_not_restart() {
        let scheduler = TaskScheduler::new(Duration::from_secs(1));
        scheduler.start();
        scheduler.dispose();

        assert!(!scheduler.start());
        assert!(!scheduler.resume());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }
}
