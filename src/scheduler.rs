//! Deferred and coalesced background work.
//!
//! [`Debouncer`] runs a task once activity has been quiet for a delay; each new
//! trigger supersedes the pending one. [`RebuildGate`] makes sure only one
//! rebuild runs at a time, and that a trigger arriving during a rebuild causes
//! exactly one more pass instead of a concurrent one.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs the most recently triggered task after a quiet period.
///
/// A superseded timer wakes up, notices it is stale and exits without running
/// its task. A task that already started is never interrupted.
#[derive(Debug)]
pub struct Debouncer {
    name: &'static str,
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Debouncer {
            name,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task` to run after the delay, superseding any pending task.
    ///
    /// Returns `false` when called outside a tokio runtime; nothing is
    /// scheduled then.
    pub fn trigger<F, Fut>(&self, task: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("Debouncer '{}' triggered outside a tokio runtime", self.name);
            return false;
        };

        let mut pending = self.pending.lock();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let current = Arc::clone(&self.generation);
        let delay = self.delay;
        let name = self.name;

        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::Acquire) != generation {
                return;
            }
            debug!("Debouncer '{name}' firing");
            task().await;
        }));
        true
    }

    /// Drop the pending task, if any.
    pub fn cancel(&self) {
        let _pending = self.pending.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether a scheduled task has not finished yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Single-flight guard for rebuilds.
#[derive(Debug, Default)]
pub struct RebuildGate {
    running: AtomicBool,
    dirty: AtomicBool,
}

impl RebuildGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run `rebuild` unless a rebuild is already running, in which case that
    /// one is told to go around once more.
    ///
    /// Returns whether this call ran the rebuild itself.
    pub async fn run<F, Fut>(&self, mut rebuild: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.dirty.store(true, Ordering::Release);
        if self.running.swap(true, Ordering::AcqRel) {
            return false;
        }

        loop {
            while self.dirty.swap(false, Ordering::AcqRel) {
                rebuild().await;
            }
            self.running.store(false, Ordering::Release);

            // A trigger may have marked the gate dirty after the last pass
            // while still seeing it running.
            if !self.dirty.load(Ordering::Acquire) || self.running.swap(true, Ordering::AcqRel) {
                break;
            }
        }
        true
    }
}
