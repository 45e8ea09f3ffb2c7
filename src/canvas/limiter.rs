// src/canvas/limiter.rs

//! Frame-rate limiter applied before admitting a paint cycle.
//!
//! Waiting happens on a condvar, so the limiter lock is released for the
//! duration of the wait and [`FrameLimiter::interrupt`] can end it early.

use log::trace;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct LimiterState {
    fps_limit: u32,
    /// Start of the most recently admitted frame (possibly in the future,
    /// when a waiter has reserved its slot). `None` until the first frame.
    last_frame: Option<Instant>,
    /// Bumped by `interrupt`; waiters stop when it moves.
    interrupts: u64,
}

#[derive(Debug)]
pub struct FrameLimiter {
    state: Mutex<LimiterState>,
    wake: Condvar,
}

fn budget_for(fps_limit: u32) -> Option<Duration> {
    match fps_limit {
        0 => None,
        fps => Some(Duration::from_millis(1000 / u64::from(fps))),
    }
}

impl FrameLimiter {
    /// `fps_limit == 0` disables throttling.
    pub fn new(fps_limit: u32) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                fps_limit,
                last_frame: None,
                interrupts: 0,
            }),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fps_limit(&self) -> u32 {
        self.lock().fps_limit
    }

    pub fn set_fps_limit(&self, fps_limit: u32) {
        self.lock().fps_limit = fps_limit;
    }

    /// Time allotted to one frame, if limited.
    pub fn frame_budget(&self) -> Option<Duration> {
        budget_for(self.fps_limit())
    }

    /// Blocks for whatever is left of the current frame budget.
    ///
    /// Spurious wakeups go back to waiting. An [`interrupt`](Self::interrupt)
    /// ends the wait and the frame is admitted right away.
    pub fn throttle(&self) {
        let mut state = self.lock();
        let Some(budget) = budget_for(state.fps_limit) else {
            return;
        };
        let now = Instant::now();
        let deadline = match state.last_frame {
            Some(last_frame) if last_frame + budget > now => last_frame + budget,
            _ => {
                state.last_frame = Some(now);
                return;
            }
        };

        // Reserve the slot so concurrent callers queue up behind it.
        state.last_frame = Some(deadline);
        let seen = state.interrupts;
        trace!("FrameLimiter: Waiting {:?}", deadline - now);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            let (guard, _) = self
                .wake
                .wait_timeout(state, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
            if state.interrupts != seen {
                trace!("FrameLimiter: Wait interrupted");
                state.last_frame = Some(Instant::now());
                return;
            }
        }
    }

    /// Ends every wait in progress.
    pub fn interrupt(&self) {
        self.lock().interrupts += 1;
        self.wake.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use test_log::test;

    #[test]
    fn unlimited_never_blocks() {
        let limiter = FrameLimiter::new(0);
        assert_eq!(limiter.frame_budget(), None);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.throttle();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn limited_frames_are_spaced_by_the_budget() {
        let limiter = FrameLimiter::new(20);
        assert_eq!(limiter.frame_budget(), Some(Duration::from_millis(50)));

        limiter.throttle();
        let start = Instant::now();
        limiter.throttle();
        limiter.throttle();
        assert!(start.elapsed() >= Duration::from_millis(90), "{:?}", start.elapsed());
    }

    #[test]
    fn stray_unparks_do_not_shorten_the_wait() {
        let handle = thread::spawn(|| {
            let limiter = FrameLimiter::new(5);
            limiter.throttle();
            let start = Instant::now();
            limiter.throttle();
            start.elapsed()
        });
        for _ in 0..15 {
            thread::sleep(Duration::from_millis(10));
            handle.thread().unpark();
        }
        let waited = handle.join().unwrap();
        assert!(waited >= Duration::from_millis(190), "{:?}", waited);
    }

    #[test]
    fn interrupt_ends_the_wait_early() {
        let limiter = Arc::new(FrameLimiter::new(1));
        let waiter = {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || {
                limiter.throttle();
                let start = Instant::now();
                limiter.throttle();
                start.elapsed()
            })
        };
        thread::sleep(Duration::from_millis(100));
        limiter.interrupt();
        let waited = waiter.join().unwrap();
        assert!(waited < Duration::from_millis(900), "{:?}", waited);
    }

    #[test]
    fn settings_stay_available_while_a_caller_waits() {
        let limiter = Arc::new(FrameLimiter::new(1));
        let waiter = {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || {
                limiter.throttle();
                limiter.throttle();
            })
        };
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        assert_eq!(limiter.fps_limit(), 1);
        limiter.set_fps_limit(30);
        assert!(start.elapsed() < Duration::from_millis(200), "{:?}", start.elapsed());
        assert_eq!(limiter.fps_limit(), 30);

        limiter.interrupt();
        waiter.join().unwrap();
    }
}
