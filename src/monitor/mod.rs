pub mod run;
mod scheduler;
mod timers;
pub mod watcher;

pub use scheduler::{HygieneHook, SchedulerState, StagePlan, TaskScheduler};
pub use timers::{Debouncer, TimerArena, TimerId};

use crate::core::channel::PrivilegedChannel;
use crate::core::config::FrontendSettings;
use crate::core::status::{PROBES, ProbeContext, ProbePaths, ProbeSpec, Stage, StatusCache, ThrottledTask};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Status cache, probe tasks and the scheduler that polls them.
pub struct Monitor {
    cache: StatusCache,
    scheduler: TaskScheduler,
    tasks: HashMap<String, Arc<ThrottledTask>>,
    plan: StagePlan,
}

impl Monitor {
    pub fn new(channel: Arc<dyn PrivilegedChannel>, settings: &FrontendSettings) -> Self {
        Self::with_probes(channel, settings, PROBES)
    }

    pub fn with_probes(
        channel: Arc<dyn PrivilegedChannel>,
        settings: &FrontendSettings,
        probes: &[ProbeSpec],
    ) -> Self {
        let cache = StatusCache::new();
        let ctx = Arc::new(ProbeContext {
            channel,
            paths: ProbePaths {
                value_dir: settings.paths.value_dir.clone(),
                api_dir: settings.paths.api_dir.clone(),
            },
        });

        let hygiene_cache = cache.clone();
        let scheduler = TaskScheduler::new(settings.tick()).with_hygiene(
            settings.hygiene_interval(),
            move || {
                hygiene_cache.compact();
                debug!(target: "azenith::monitor", "Hygiene pass ({} entries)", hygiene_cache.len());
            },
        );

        let mut tasks = HashMap::new();
        let mut plan = StagePlan::default();
        let (mut quick, mut heavy) = (Vec::new(), Vec::new());

        for spec in probes {
            let interval = settings.interval_for(spec.key, spec.periodic_ms.unwrap_or(0));
            let task = Arc::new(spec.into_task(ctx.clone(), cache.clone(), interval));
            if spec.periodic_ms.is_some() {
                scheduler.register(task.clone());
            }
            match spec.stage {
                Stage::FirstPaint => plan.first_paint.push(task.clone()),
                Stage::Quick => quick.push(task.clone()),
                Stage::HeavyAsync => heavy.push(task.clone()),
                Stage::Sequential => plan.sequential.push(task.clone()),
            }
            tasks.insert(spec.key.to_string(), task);
        }
        plan.medium = [quick, heavy].into_iter().filter(|b| !b.is_empty()).collect();

        Self {
            cache,
            scheduler,
            tasks,
            plan,
        }
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Last known value for `key`, or a placeholder. Never blocks on I/O.
    pub fn cached_status(&self, key: &str) -> String {
        self.cache.display(key)
    }

    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.cache.snapshot()
    }

    /// Fetches `key` now, bypassing its interval.
    pub async fn request_refresh(&self, key: &str) -> Result<String> {
        let task = self
            .tasks
            .get(key)
            .with_context(|| format!("unknown status key `{}`", key))?;
        task.run_now().await
    }

    pub async fn heavy_init(&self) -> bool {
        self.scheduler.heavy_init(&self.plan).await
    }

    pub fn start(&self) -> bool {
        self.scheduler.start()
    }

    pub fn stop(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn on_visibility(&self, visibility: Visibility) {
        debug!(target: "azenith::monitor", "Visibility -> {:?}", visibility);
        match visibility {
            Visibility::Hidden => self.scheduler.suspend(),
            Visibility::Visible => {
                self.scheduler.resume();
            }
        }
    }

    pub fn dispose(&self) {
        self.scheduler.dispose();
    }

    /// One-shot work that is cancelled when the monitor stops.
    pub fn schedule_deferred<F>(&self, delay: Duration, work: F) -> TimerId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.scheduler.timers().schedule(delay, work)
    }

    pub fn debouncer(&self, delay: Duration) -> Debouncer {
        Debouncer::new(self.scheduler.timers().clone(), delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::fake::FakeChannel;
    use crate::core::status::PLACEHOLDER_INITIALIZING;

    fn settings() -> FrontendSettings {
        let mut settings = FrontendSettings::default();
        settings.paths.value_dir = "/v".into();
        settings.paths.api_dir = "/api".into();
        settings
    }

    fn scripted() -> Arc<FakeChannel> {
        let channel = Arc::new(FakeChannel::new());
        channel.reply("pidof sys.azenith-service", "812\n");
        channel.set_file("/api/current_profile", "2");
        channel.set_file("/v/AIenabled", "1");
        channel.set_file("/v/cpulimit", "0");
        channel.reply("uname -r", "5.15.123-android\n");
        channel
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_fills_the_cache() {
        let channel = scripted();
        let monitor = Monitor::new(channel, &settings());

        assert_eq!(monitor.cached_status("kernel"), PLACEHOLDER_INITIALIZING);
        assert_eq!(monitor.request_refresh("kernel").await.unwrap(), "5.15.123-android");
        assert_eq!(monitor.cached_status("kernel"), "5.15.123-android");
        assert!(monitor.request_refresh("battery").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn heavy_init_populates_and_starts() {
        let channel = scripted();
        let monitor = Monitor::new(channel, &settings());

        assert!(monitor.heavy_init().await);
        assert_eq!(monitor.scheduler().state(), SchedulerState::Running);
        assert_eq!(monitor.cached_status("service"), "Running (auto) (PID 812)");
        assert_eq!(monitor.cached_status("profile"), "Balanced");
        assert_eq!(monitor.cached_status("kernel"), "5.15.123-android");
        // unscripted probes stay on the placeholder
        assert_eq!(monitor.cached_status("soc"), PLACEHOLDER_INITIALIZING);
        monitor.dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_cycles_do_not_repeat_init() {
        let channel = scripted();
        let monitor = Monitor::new(channel.clone(), &settings());
        monitor.heavy_init().await;

        for _ in 0..3 {
            monitor.on_visibility(Visibility::Hidden);
            assert_eq!(monitor.scheduler().state(), SchedulerState::Stopped);
            monitor.on_visibility(Visibility::Visible);
            assert_eq!(monitor.scheduler().state(), SchedulerState::Running);
            monitor.heavy_init().await;
        }
        assert_eq!(channel.call_count("uname -r"), 1);
        monitor.dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn polling_picks_up_profile_changes() {
        let channel = scripted();
        let monitor = Monitor::new(channel.clone(), &settings());
        monitor.heavy_init().await;
        assert_eq!(monitor.cached_status("profile"), "Balanced");

        channel.set_file("/api/current_profile", "1");
        tokio::time::sleep(Duration::from_millis(6500)).await;
        assert_eq!(monitor.cached_status("profile"), "Performance");
        monitor.dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_monitor_drops_deferred_work() {
        let monitor = Monitor::new(scripted(), &settings());
        let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let f = fired.clone();

        monitor.schedule_deferred(Duration::from_secs(1), async move {
            f.store(true, std::sync::atomic::Ordering::SeqCst);
        });
        monitor.on_visibility(Visibility::Hidden);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!fired.load(std::sync::atomic::Ordering::SeqCst));
    }
}
