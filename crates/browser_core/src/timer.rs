//! One-shot animation-frame timer (spec.md §4.9), grounded on
//! `original_source/js.py`'s `threading.Timer(time / 1000.0,
//! run_callback).start()` one-shot pattern and `constants.py`'s
//! `REFRESH_RATE_SEC`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Matches `original_source/constants.py`'s `REFRESH_RATE_SEC = 0.033`.
pub const REFRESH_RATE_SEC: f32 = 0.033;

/// Tracks whether a one-shot animation timer is currently pending, so
/// `schedule_animation_frame` can no-op while one is already in flight
/// (spec.md §4.9: "if `needs_animation_frame && !animation_timer`").
#[derive(Default)]
pub struct AnimationTimer {
    pending: Arc<AtomicBool>,
}

impl AnimationTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Starts a one-shot timer at `REFRESH_RATE_SEC` that invokes `on_fire`
    /// exactly once on a dedicated thread, then clears `is_pending`. A
    /// no-op if a timer is already pending.
    pub fn schedule<F>(&self, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let pending = Arc::clone(&self.pending);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs_f32(REFRESH_RATE_SEC));
            pending.store(false, Ordering::SeqCst);
            on_fire();
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn schedule_fires_once_and_clears_pending() {
        let timer = AnimationTimer::new();
        let (tx, rx) = mpsc::channel();
        timer.schedule(move || tx.send(()).unwrap());
        assert!(timer.is_pending());
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        // Give the spawned thread a moment to clear the flag after
        // sending, since the two happen in that order but aren't
        // synchronized with the channel recv.
        std::thread::sleep(Duration::from_millis(20));
        assert!(!timer.is_pending());
    }

    #[test]
    fn second_schedule_while_pending_is_a_no_op() {
        let timer = AnimationTimer::new();
        let (tx, rx) = mpsc::channel::<u32>();
        let tx2 = tx.clone();
        timer.schedule(move || tx.send(1).unwrap());
        timer.schedule(move || tx2.send(2).unwrap());
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, 1);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
