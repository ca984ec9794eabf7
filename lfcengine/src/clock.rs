//! Cumulative pacing clock for real-time frame release.
//!
//! OS timers have coarse granularity and positive jitter while MPEG frames
//! are ~26 ms apart. Sleeping per frame would accumulate drift, so the
//! clock keeps one monotonic reference and a running time budget: each
//! frame adds its duration, and `wait()` blocks until the budget catches
//! up with real time. The tail of each wait is a short busy-spin that
//! absorbs the timer's residual jitter.

use std::time::{Duration, Instant};

/// Ceiling of the busy-wait tail. On a multi-threaded runtime a
/// sub-millisecond spin is acceptable; single-threaded embedders can
/// lower it via [`PaceClock::with_spin_ceiling`].
pub const DEFAULT_SPIN_CEILING: Duration = Duration::from_millis(1);

/// Monotonic time-budget tracker.
///
/// Typical use: `add_time(frame.duration_ms)` after broadcasting each
/// frame, then `wait().await` before reading the next one.
pub struct PaceClock {
    t0: Instant,
    target_ms: f64,
    spin_ceiling: Duration,
}

impl PaceClock {
    /// Creates a clock whose reference instant is "now".
    pub fn new() -> Self {
        Self::with_spin_ceiling(DEFAULT_SPIN_CEILING)
    }

    /// Creates a clock with a custom busy-wait ceiling.
    pub fn with_spin_ceiling(spin_ceiling: Duration) -> Self {
        Self {
            t0: Instant::now(),
            target_ms: 0.0,
            spin_ceiling,
        }
    }

    /// Extends the budget by `dt_ms` milliseconds.
    pub fn add_time(&mut self, dt_ms: f64) {
        self.target_ms += dt_ms;
    }

    /// Milliseconds until the budget is due; 0 when already overdue.
    pub fn delay_ms(&self) -> f64 {
        let elapsed_ms = self.t0.elapsed().as_secs_f64() * 1000.0;
        (self.target_ms - elapsed_ms).max(0.0)
    }

    /// Blocks until the budget is exhausted: a coarse async sleep down to
    /// the spin ceiling, then a busy-spin for the residual.
    pub async fn wait(&self) {
        let ceiling_ms = self.spin_ceiling.as_secs_f64() * 1000.0;
        loop {
            let delay = self.delay_ms();
            if delay <= 0.0 {
                return;
            }
            if delay > ceiling_ms {
                tokio::time::sleep(Duration::from_secs_f64((delay - ceiling_ms) / 1000.0)).await;
            } else {
                while self.delay_ms() > 0.0 {
                    std::hint::spin_loop();
                }
                return;
            }
        }
    }

    /// Restarts the reference instant and clears the budget.
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.target_ms = 0.0;
    }
}

impl Default for PaceClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paced_iterations_track_real_time() {
        // 120 × 20 ms = 2.4 s; the contract allows ±0.5 % of Σd
        let mut clock = PaceClock::new();
        let start = Instant::now();

        for _ in 0..120 {
            clock.add_time(20.0);
            clock.wait().await;
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let target_ms = 120.0 * 20.0;
        let drift = (elapsed_ms - target_ms).abs();
        assert!(
            drift <= target_ms * 0.005,
            "drift {:.3} ms exceeds 0.5% of {:.0} ms",
            drift,
            target_ms
        );
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_overdue() {
        let mut clock = PaceClock::new();
        clock.add_time(1.0);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let start = Instant::now();
        clock.wait().await;
        assert!(start.elapsed() < Duration::from_millis(5));
        assert_eq!(clock.delay_ms(), 0.0);
    }

    #[tokio::test]
    async fn test_reset_clears_the_budget() {
        let mut clock = PaceClock::new();
        clock.add_time(500.0);
        clock.reset();
        assert_eq!(clock.delay_ms(), 0.0);

        let start = Instant::now();
        clock.wait().await;
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_budget_accumulates() {
        let mut clock = PaceClock::new();
        clock.add_time(5.0);
        clock.add_time(7.5);
        assert!(clock.delay_ms() <= 12.5);
        assert!(clock.delay_ms() > 10.0);
    }
}
