//! Single-shot timer primitive on top of the tokio runtime

use std::time::Duration;

use tokio::task::AbortHandle;

/// Handle to a pending single-shot timer.
///
/// Cancelling the handle aborts the timer task before it fires. Cancelling a
/// handle whose timer has already fired, or cancelling twice, has no effect.
///
/// Note that cancelling a handle returned by
/// [`IntervalScheduler::start`](crate::IntervalScheduler::start) directly
/// kills the pending timer chain without updating the scheduler's own state;
/// use [`IntervalScheduler::stop`](crate::IntervalScheduler::stop) for that.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    /// Cancel the pending timer. Idempotent.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// True once the timer task has fired or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Schedule `action` to run once after `delay`.
///
/// The action runs on the tokio runtime; this must be called from within a
/// runtime context or it panics. A zero delay fires as soon as the runtime
/// polls the timer task.
pub fn schedule_after<F>(delay: Duration, action: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        action();
    });

    TimerHandle {
        abort: task.abort_handle(),
    }
}
