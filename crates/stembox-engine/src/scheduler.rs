//! Deferred-start scheduling for FX echoes.
//!
//! An echo whose natural start time lies ahead of the transport position is
//! armed as a one-shot timer. All armed timers live in one cancellable set;
//! pause and stop cancel the whole set before returning, so a stale timer
//! can never start an echo after the transport has stopped.

use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

/// Cancels one armed timer.
pub struct CancelToken(AbortHandle);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.abort();
    }

    /// Whether the timer already fired (or was cancelled).
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

/// Owns every pending deferred start.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot callback after `delay_ms` milliseconds.
    ///
    /// Must be called within a tokio runtime. Under tokio's paused test
    /// clock this is fully deterministic.
    pub fn arm(&mut self, delay_ms: u64, callback: impl FnOnce() + Send + 'static) -> CancelToken {
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            callback();
        });
        let token = CancelToken(task.abort_handle());
        self.tasks.push(task);
        token
    }

    /// Cancel every pending timer. Fired timers are dropped from the set.
    pub fn cancel_all(&mut self) {
        let pending = self.tasks.iter().filter(|t| !t.is_finished()).count();
        if pending > 0 {
            debug!(pending, "cancelling deferred echo starts");
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Number of timers armed and not yet fired or cancelled.
    pub fn pending(&mut self) -> usize {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
