//! Scheduler module for drift-corrected periodic ticks

pub mod interval_scheduler;
pub mod metrics;

pub use interval_scheduler::{IntervalScheduler, SchedulerError, TickCallback};
pub use metrics::{TickMetrics, TickStats};
