//! Cancel-and-reschedule debouncer for Crewhush.
//!
//! Lobbies request a status announcement after nearly every roster
//! mutation. Posting each one would flood the text sink, so requests are
//! coalesced: every [`Debouncer::schedule`] call replaces the pending job
//! and restarts the delay. Only the last job of a burst runs.
//!
//! # Cancellation window
//!
//! A job can only be superseded while it is still waiting out its delay.
//! Once the delay elapses the job runs to completion even if a newer one
//! is scheduled meanwhile, so a half-sent announcement is never aborted.
//! Jobs that must not overlap serialize themselves.
//!
//! ```ignore
//! let debouncer = Debouncer::new(Duration::from_millis(300));
//! debouncer.schedule(async move { lobby.announce().await });
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters describing how much coalescing happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// Total `schedule` calls.
    pub scheduled: u64,
    /// Jobs replaced or cancelled before their delay elapsed.
    pub superseded: u64,
    /// Jobs that ran, delayed or immediate.
    pub fired: u64,
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    superseded: AtomicU64,
    fired: AtomicU64,
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

struct Pending {
    id: u64,
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Holds at most one pending delayed job.
///
/// Dropping the debouncer cancels the pending job.
pub struct Debouncer {
    delay: Duration,
    pending: std::sync::Arc<Mutex<Option<Pending>>>,
    next_id: AtomicU64,
    counters: std::sync::Arc<Counters>,
}

impl Debouncer {
    /// Creates a debouncer with a fixed delay. A zero delay still defers
    /// the job to a spawned task.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Default::default(),
            next_id: AtomicU64::new(1),
            counters: Default::default(),
        }
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces any pending job with `job`, to run after the delay.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        let (cancel, cancelled) = oneshot::channel::<()>();
        let pending = std::sync::Arc::clone(&self.pending);
        let counters = std::sync::Arc::clone(&self.counters);

        let mut slot = lock(&self.pending);
        self.counters.scheduled.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = slot.take() {
            supersede(previous, &self.counters);
        }

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancelled => {
                    trace!(job = id, "debounced job cancelled");
                    return;
                }
            }
            // Leave the slot so later schedules no longer target this job.
            {
                let mut slot = lock(&pending);
                if slot.as_ref().is_some_and(|p| p.id == id) {
                    slot.take();
                }
            }
            counters.fired.fetch_add(1, Ordering::Relaxed);
            trace!(job = id, "debounced job firing");
            job.await;
        });

        *slot = Some(Pending { id, cancel, handle });
        trace!(job = id, delay_ms = delay.as_millis() as u64, "debounced job scheduled");
    }

    /// Cancels any pending job and runs `job` right away on a new task.
    pub fn fire_now<F>(&self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.counters.fired.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(job)
    }

    /// Cancels the pending job. Returns `true` if one was waiting.
    pub fn cancel(&self) -> bool {
        match lock(&self.pending).take() {
            Some(previous) => {
                debug!(job = previous.id, "pending job cancelled");
                supersede(previous, &self.counters);
                true
            }
            None => false,
        }
    }

    /// Whether a job is waiting out its delay.
    pub fn is_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Snapshot of the coalescing counters.
    pub fn stats(&self) -> DebounceStats {
        DebounceStats {
            scheduled: self.counters.scheduled.load(Ordering::Relaxed),
            superseded: self.counters.superseded.load(Ordering::Relaxed),
            fired: self.counters.fired.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(previous) = lock(&self.pending).take() {
            let _ = previous.cancel.send(());
            previous.handle.abort();
        }
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

fn supersede(previous: Pending, counters: &Counters) {
    // A send failure means the job already left its delay and is running.
    if previous.cancel.send(()).is_ok() {
        counters.superseded.fetch_add(1, Ordering::Relaxed);
    }
}

fn lock(slot: &Mutex<Option<Pending>>) -> MutexGuard<'_, Option<Pending>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
