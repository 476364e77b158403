//! Drift-corrected interval scheduling on top of the tokio runtime
//!
//! A naive "sleep, then run" loop slips a little later on every cycle because
//! the callback's own execution time is never subtracted from the wait. The
//! scheduler here anchors every tick to a fixed baseline instead, so the
//! long-run invocation rate converges on the requested period.

pub mod config;
pub mod scheduler;
pub mod timer;

pub use config::SchedulerConfig;
pub use scheduler::{IntervalScheduler, SchedulerError, TickMetrics, TickStats};
pub use timer::TimerHandle;
