//! Cancellation for running uploads: a shared abort token.
//!
//! The CLI hands a clone of the token to a Ctrl-C listener; the upload
//! driver checks it before every chunk send and before every backoff sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of [`CancellableSleep`] polling.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Cloneable abort flag shared between the driver and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Blocking delay capability used between retry attempts.
pub trait Delay {
    fn sleep(&mut self, duration: Duration);
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Plain `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Delay for ThreadSleep {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleeps in short slices and returns early once the token is cancelled,
/// so shutdown never waits out a long backoff.
#[derive(Debug, Clone)]
pub struct CancellableSleep {
    token: CancelToken,
}

impl CancellableSleep {
    pub fn new(token: CancelToken) -> Self {
        Self { token }
    }
}

impl Delay for CancellableSleep {
    fn sleep(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            if self.token.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn cancellable_sleep_returns_early() {
        let token = CancelToken::new();
        token.cancel();
        let mut sleep = CancellableSleep::new(token);
        let start = Instant::now();
        sleep.sleep(Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
