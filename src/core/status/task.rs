use super::cache::StatusCache;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

pub type FetchFuture = BoxFuture<'static, anyhow::Result<String>>;
pub type FetchFn = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// A fetch function guarded by a minimum re-fetch interval.
///
/// `last_run` is stamped on every attempt, failed or not, so a failing
/// channel is retried at most once per interval. Only one fetch per task
/// is in flight at a time.
pub struct ThrottledTask {
    key: String,
    interval: Duration,
    fetch: FetchFn,
    cache: StatusCache,
    last_run: Mutex<Option<Instant>>,
    in_flight: Arc<AtomicBool>,
    attempts: AtomicU64,
}

impl ThrottledTask {
    pub fn new<F, Fut>(key: impl Into<String>, interval: Duration, cache: StatusCache, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let key = key.into();
        cache.register(&key, interval);
        Self {
            key,
            interval,
            fetch: Arc::new(move || Box::pin(fetch()) as FetchFuture),
            cache,
            last_run: Mutex::new(None),
            in_flight: Arc::new(AtomicBool::new(false)),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_run(&self) -> Option<Instant> {
        self.last_run.lock().ok().and_then(|l| *l)
    }

    /// Number of fetches started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn claim(&self, now: Instant) -> bool {
        let Ok(mut last) = self.last_run.lock() else {
            return false;
        };
        if let Some(prev) = *last
            && now.saturating_duration_since(prev) < self.interval
        {
            return false;
        }
        *last = Some(now);
        true
    }

    /// Dispatches a fetch if the interval has elapsed since the last attempt.
    ///
    /// The fetch runs on its own task; the caller never waits for it.
    pub fn maybe_run(&self, now: Instant) -> Option<JoinHandle<()>> {
        if self.is_in_flight() {
            debug!(target: "azenith::status", "{}: previous fetch still running, skip", self.key);
            return None;
        }
        if !self.claim(now) {
            return None;
        }

        self.in_flight.store(true, Ordering::Release);
        self.attempts.fetch_add(1, Ordering::AcqRel);

        let guard = InFlight(self.in_flight.clone());
        let started = Instant::now();
        let fut = (self.fetch)();
        let cache = self.cache.clone();
        let key = self.key.clone();

        Some(tokio::spawn(async move {
            let outcome = fut.await;
            drop(guard);
            record(&cache, &key, started, outcome);
        }))
    }

    /// Fetches immediately, ignoring the throttle, and waits for the result.
    pub async fn run_now(&self) -> anyhow::Result<String> {
        if let Ok(mut last) = self.last_run.lock() {
            *last = Some(Instant::now());
        }
        self.attempts.fetch_add(1, Ordering::AcqRel);

        let started = Instant::now();
        let outcome = (self.fetch)().await;
        let value = match &outcome {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(anyhow::anyhow!("{}: {:#}", self.key, e)),
        };
        record(&self.cache, &self.key, started, outcome);
        value
    }
}

/// Clears the in-flight flag when the fetch ends, including by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn record(cache: &StatusCache, key: &str, started: Instant, outcome: anyhow::Result<String>) {
    match outcome {
        Ok(value) => {
            if cache.set(key, value.clone(), started) {
                debug!(target: "azenith::status", "{} = {}", key, value);
            } else {
                debug!(target: "azenith::status", "{}: newer value already cached, dropping {}", key, value);
            }
        }
        Err(e) => {
            warn!(target: "azenith::status", "Fetch {} failed, keeping last value: {:#}", key, e);
        }
    }
}
