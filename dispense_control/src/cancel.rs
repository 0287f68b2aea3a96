//! Cancellation token.
//!
//! Set from the signal handler or the input thread, observed by the command
//! thread at every loop iteration and inside every blocking wait.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// The in-flight operation was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Shared abort flag with interruptible sleep.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// New token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every sleeper.
    pub fn cancel(&self) {
        *self.inner.cancelled.lock() = true;
        self.inner.wake.notify_all();
    }

    /// True once `cancel` has been called and not yet `reset`.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Clear the flag after the abort has been handled.
    pub fn reset(&self) {
        *self.inner.cancelled.lock() = false;
    }

    /// `Err(Cancelled)` if cancellation is pending.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
    }

    /// Block for `duration` unless cancelled first.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        if duration.is_zero() {
            return self.check();
        }
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self.inner.wake.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        if *cancelled { Err(Cancelled) } else { Ok(()) }
    }
}
