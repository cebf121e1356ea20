//! Fixed-tick pacing for the logic thread.
//!
//! The logic loop is self-correcting rather than exact: each iteration
//! measures how long the tick body took, then sleeps for the remainder of
//! the period, clamped to a 1 ms floor. Under overload the loop degrades
//! gracefully (ticks slip) instead of ever computing a zero or negative
//! sleep.

use std::time::Duration;

use crate::containers::Deq;

/// Nominal logic rate, ticks per second.
pub const TICK_HZ: u64 = 30;

const MS_PER_SECOND: u64 = 1000;
const MIN_SLEEP: Duration = Duration::from_millis(1);
const FRAME_SAMPLE_WINDOW: usize = 60;

/// Computes the pacing sleep for one tick: `period - elapsed`, never less
/// than 1 ms. Pure so the clamp law is directly testable.
pub fn pacing_sleep(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed).max(MIN_SLEEP)
}

/// Per-tick bookkeeping: second rollover for uptime/FPS stats and a
/// sliding window of recent frame durations for a smoothed rate.
pub struct TickPacer {
    period: Duration,
    elapsed_ms: u64,
    seconds: u64,
    frame_samples: Deq<f64>,
}

impl TickPacer {
    pub fn new(tick_hz: u64) -> Self {
        Self {
            period: Duration::from_millis(MS_PER_SECOND / tick_hz.max(1)),
            elapsed_ms: 0,
            seconds: 0,
            frame_samples: Deq::with_capacity(FRAME_SAMPLE_WINDOW),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Accumulates one nominal period. Returns true when a full second has
    /// rolled over -- the caller snapshots its FPS statistic on that edge.
    pub fn advance(&mut self) -> bool {
        self.elapsed_ms += self.period.as_millis() as u64;
        if self.elapsed_ms >= MS_PER_SECOND {
            self.elapsed_ms -= MS_PER_SECOND;
            self.seconds += 1;
            true
        } else {
            false
        }
    }

    /// Whole seconds of logic-thread uptime.
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn sleep_for(&self, tick_elapsed: Duration) -> Duration {
        pacing_sleep(self.period, tick_elapsed)
    }

    /// Feeds one measured frame duration into the smoothing window.
    pub fn record_frame_time(&mut self, dt_secs: f64) {
        if self.frame_samples.len() == FRAME_SAMPLE_WINDOW {
            self.frame_samples.pop_front();
        }
        self.frame_samples.push_back(dt_secs);
    }

    pub fn smoothed_fps(&self) -> f64 {
        if self.frame_samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.frame_samples.iter().sum();
        if sum > 0.0 {
            self.frame_samples.len() as f64 / sum
        } else {
            0.0
        }
    }
}

impl Default for TickPacer {
    fn default() -> Self {
        Self::new(TICK_HZ)
    }
}
