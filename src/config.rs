use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between ticks in seconds
const DEFAULT_PERIOD_SECS: u64 = 30;

/// Default number of recent callback durations kept for slow detection
const DEFAULT_METRICS_WINDOW: usize = 10;

/// Configuration for an [`IntervalScheduler`](crate::IntervalScheduler) run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Target period between callback invocations
    pub period: Duration,

    /// Fire the callback synchronously on the first tick instead of waiting
    /// one full period
    pub run_immediately: bool,

    /// Sliding window size for callback duration tracking
    pub metrics_window: usize,

    /// Callback duration considered slow; `None` falls back to the period
    pub slow_threshold: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(DEFAULT_PERIOD_SECS),
            run_immediately: false,
            metrics_window: DEFAULT_METRICS_WINDOW,
            slow_threshold: None,
        }
    }
}
