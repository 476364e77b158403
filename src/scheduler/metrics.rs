//! Callback timing metrics for a scheduler instance

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Minimum number of recorded durations before slow detection kicks in
const MIN_SLOW_SAMPLES: usize = 3;

/// Sliding window of recent callback durations.
#[derive(Debug, Clone)]
pub struct TickMetrics {
    recent_durations: VecDeque<Duration>,
    window: usize,
    slow_threshold: Duration,
}

impl TickMetrics {
    pub fn new(window: usize, slow_threshold: Duration) -> Self {
        Self {
            recent_durations: VecDeque::with_capacity(window),
            window,
            slow_threshold,
        }
    }

    /// Record one callback duration, evicting the oldest entry once the
    /// window is full.
    pub fn record(&mut self, duration: Duration) {
        if self.recent_durations.len() >= self.window {
            self.recent_durations.pop_front();
        }
        self.recent_durations.push_back(duration);
    }

    /// True when every recent callback ran over the slow threshold.
    ///
    /// Requires a few samples before reporting, so a single hiccup right
    /// after start does not count as "consistently" slow.
    pub fn is_consistently_slow(&self) -> bool {
        if self.recent_durations.len() < MIN_SLOW_SAMPLES {
            return false;
        }

        self.recent_durations
            .iter()
            .all(|&d| d > self.slow_threshold)
    }

    /// Average callback duration over the window, zero when empty.
    pub fn average_duration(&self) -> Duration {
        if self.recent_durations.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.recent_durations.iter().sum();
        total / self.recent_durations.len() as u32
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    pub fn sample_count(&self) -> usize {
        self.recent_durations.len()
    }
}

/// Cumulative tick statistics for one scheduler instance.
///
/// Counters survive `stop`/`start` cycles, matching how the baseline anchor
/// itself is carried across a restart. The metrics window is replaced on
/// every `start` so slow detection always reflects the current period.
#[derive(Debug, Clone)]
pub struct TickStats {
    /// Ticks processed, including a first tick where the callback was skipped
    pub total_ticks: u64,
    /// Ticks on which the callback actually ran
    pub total_runs: u64,
    /// Time spent inside the callback across all runs
    pub total_callback_time: Duration,
    pub last_tick_started: Option<Instant>,
    pub last_tick_completed: Option<Instant>,
    pub metrics: TickMetrics,
}

impl TickStats {
    pub fn new(metrics: TickMetrics) -> Self {
        Self {
            total_ticks: 0,
            total_runs: 0,
            total_callback_time: Duration::ZERO,
            last_tick_started: None,
            last_tick_completed: None,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_evicts_oldest() {
        let mut metrics = TickMetrics::new(3, Duration::from_millis(100));
        for ms in [10, 20, 30, 40] {
            metrics.record(Duration::from_millis(ms));
        }

        assert_eq!(metrics.sample_count(), 3);
        // 10ms fell out of the window: (20 + 30 + 40) / 3
        assert_eq!(metrics.average_duration(), Duration::from_millis(30));
    }

    #[test]
    fn test_slow_detection_needs_enough_samples() {
        let mut metrics = TickMetrics::new(5, Duration::from_millis(10));
        metrics.record(Duration::from_millis(50));
        metrics.record(Duration::from_millis(50));
        assert!(!metrics.is_consistently_slow());

        metrics.record(Duration::from_millis(50));
        assert!(metrics.is_consistently_slow());
    }

    #[test]
    fn test_one_fast_callback_clears_slow_flag() {
        let mut metrics = TickMetrics::new(3, Duration::from_millis(10));
        for _ in 0..3 {
            metrics.record(Duration::from_millis(50));
        }
        assert!(metrics.is_consistently_slow());

        metrics.record(Duration::from_millis(1));
        assert!(!metrics.is_consistently_slow());
    }

    #[test]
    fn test_empty_metrics_average_is_zero() {
        let metrics = TickMetrics::new(4, Duration::from_millis(100));
        assert_eq!(metrics.average_duration(), Duration::ZERO);
        assert!(!metrics.is_consistently_slow());
    }
}
