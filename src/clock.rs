//! Monotonic clock source
//!
//! Provides an epoch-seconds timestamp that never goes backward, shared
//! between the rollup sweeper and fetch alignment. A manual variant exists
//! so time-dependent components can be driven deterministically in tests.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// A clock source that guarantees monotonically non-decreasing
/// epoch-second timestamps.
pub struct Clock {
    /// High-water mark: the largest timestamp we've ever returned
    high_water: AtomicI64,
    /// When true, the clock only moves via `advance`
    manual: bool,
}

impl Clock {
    /// Create a wall-clock-backed clock.
    pub fn system() -> Self {
        Self {
            high_water: AtomicI64::new(0),
            manual: false,
        }
    }

    /// Create a manually-driven clock starting at `start` seconds.
    pub fn fixed(start: i64) -> Self {
        Self {
            high_water: AtomicI64::new(start),
            manual: true,
        }
    }

    /// Returns a monotonically non-decreasing epoch-second timestamp.
    ///
    /// If the wall clock has gone backward (e.g. NTP adjustment), returns
    /// the previous high-water mark instead.
    pub fn now_secs(&self) -> i64 {
        if self.manual {
            return self.high_water.load(Ordering::Acquire);
        }
        let wall = Utc::now().timestamp();
        loop {
            let prev = self.high_water.load(Ordering::Acquire);
            if wall <= prev {
                return prev;
            }
            match self.high_water.compare_exchange_weak(
                prev,
                wall,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return wall,
                Err(_) => continue, // CAS failed, retry
            }
        }
    }

    /// Move a manual clock forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.high_water.fetch_add(secs, Ordering::AcqRel);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_non_decreasing() {
        let clock = Clock::system();
        let mut prev = 0i64;
        for _ in 0..100 {
            let ts = clock.now_secs();
            assert!(ts >= prev, "timestamps must never go backward");
            prev = ts;
        }
    }

    #[test]
    fn test_system_clock_is_current() {
        let clock = Clock::system();
        // Should be a reasonable time (after 2020)
        assert!(clock.now_secs() > 1_577_836_800);
    }

    #[test]
    fn test_fixed_clock_only_moves_on_advance() {
        let clock = Clock::fixed(1_700_000_000);
        assert_eq!(clock.now_secs(), 1_700_000_000);
        assert_eq!(clock.now_secs(), 1_700_000_000);
        clock.advance(90);
        assert_eq!(clock.now_secs(), 1_700_000_090);
    }
}
