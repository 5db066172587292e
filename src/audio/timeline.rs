//! Playback scheduling clock.
//!
//! A [`Timeline`] holds a single mutable timestamp, the "next start
//! time", measured in seconds on a monotonic clock. Chunks queued while
//! the producer keeps ahead land back-to-back with zero gap; when the
//! producer stalls past the scheduled horizon, the next chunk simply
//! starts at the current clock time rather than trying to catch up.

use std::time::Instant;

/// Monotonic clock measuring seconds since engine creation.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created.
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// The playback schedule: one mutable "next start time" timestamp.
///
/// Non-decreasing while a session is active; reset only on explicit
/// stop.
#[derive(Debug, Default)]
pub struct Timeline {
    next_start: f64,
}

impl Timeline {
    pub const fn new() -> Self {
        Self { next_start: 0.0 }
    }

    /// Reserve a slot for a buffer of `duration` seconds given the
    /// current clock time, returning when it should begin.
    ///
    /// The start is `max(now, next_start)`: back-to-back when queued
    /// ahead of the clock, immediate (accepting an audible gap) when
    /// the producer has stalled.
    pub fn schedule(&mut self, now: f64, duration: f64) -> f64 {
        let start = if now > self.next_start {
            now
        } else {
            self.next_start
        };
        self.next_start = start + duration;
        start
    }

    /// Forget the scheduled horizon so the next chunk starts a fresh
    /// timeline. Called on hard stop, never during normal playback.
    pub fn reset(&mut self) {
        self.next_start = 0.0;
    }

    pub const fn next_start(&self) -> f64 {
        self.next_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_queue_back_to_back() {
        let mut tl = Timeline::new();
        let first = tl.schedule(0.0, 0.1);
        let second = tl.schedule(0.0, 0.1);
        let third = tl.schedule(0.0, 0.1);
        assert_eq!(first, 0.0);
        assert_eq!(second, 0.1);
        assert!((third - 0.2).abs() < 1e-9);
        assert!((tl.next_start() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn stalled_producer_restarts_at_current_time() {
        let mut tl = Timeline::new();
        tl.schedule(0.0, 0.5);
        // Producer goes silent for two seconds past the horizon.
        let start = tl.schedule(2.5, 0.5);
        assert_eq!(start, 2.5);
        assert_eq!(tl.next_start(), 3.0);
    }

    #[test]
    fn next_start_never_decreases_while_active() {
        let mut tl = Timeline::new();
        let mut horizon = 0.0;
        for (now, dur) in [(0.0, 0.2), (0.05, 0.3), (1.9, 0.1), (1.95, 0.4)] {
            tl.schedule(now, dur);
            assert!(tl.next_start() >= horizon);
            horizon = tl.next_start();
        }
    }

    #[test]
    fn reset_starts_a_fresh_session() {
        let mut tl = Timeline::new();
        tl.schedule(0.0, 5.0);
        tl.reset();
        assert_eq!(tl.next_start(), 0.0);
        // After the reset the next chunk plays at the clock time, not
        // at the stale horizon.
        assert_eq!(tl.schedule(7.0, 0.1), 7.0);
    }
}
