use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub type TimerId = u64;

/// Deferred one-shot work tracked so it can all be cancelled at once.
///
/// A timer removes its own handle when it fires.
#[derive(Default)]
pub struct TimerArena {
    next_id: AtomicU64,
    handles: Arc<Mutex<HashMap<TimerId, JoinHandle<()>>>>,
}

impl TimerArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, delay: Duration, work: F) -> TimerId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handles = self.handles.clone();

        // Held across the spawn so the timer cannot remove itself before it is inserted.
        let Ok(mut guard) = self.handles.lock() else {
            return id;
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
            if let Ok(mut h) = handles.lock() {
                h.remove(&id);
            }
        });
        guard.insert(id, handle);
        id
    }

    pub fn cancel(&self, id: TimerId) -> bool {
        let handle = self.handles.lock().ok().and_then(|mut h| h.remove(&id));
        match handle {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts every pending timer. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<JoinHandle<()>> = match self.handles.lock() {
            Ok(mut h) => h.drain().map(|(_, handle)| handle).collect(),
            Err(_) => return 0,
        };
        for handle in &drained {
            handle.abort();
        }
        if !drained.is_empty() {
            debug!(target: "azenith::monitor", "Cancelled {} pending timers", drained.len());
        }
        drained.len()
    }

    pub fn pending(&self) -> usize {
        self.handles.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl Drop for TimerArena {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Runs only the last call made within `delay`.
pub struct Debouncer {
    arena: Arc<TimerArena>,
    delay: Duration,
    pending: Mutex<Option<TimerId>>,
}

impl Debouncer {
    pub fn new(arena: Arc<TimerArena>, delay: Duration) -> Self {
        Self {
            arena,
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn call<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        if let Some(prev) = pending.take() {
            self.arena.cancel(prev);
        }
        *pending = Some(self.arena.schedule(self.delay, work));
    }
}
