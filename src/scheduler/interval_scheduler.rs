//! Drift-corrected interval scheduler
//!
//! Every tick advances a baseline anchor by exactly one period and sleeps
//! only for the time remaining until that anchor, so callback execution time
//! and timer jitter never accumulate across ticks.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{bail, Result};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::time::Instant;

use crate::config::SchedulerConfig;
use crate::scheduler::metrics::{TickMetrics, TickStats};
use crate::timer::{self, TimerHandle};

/// Errors reported by [`IntervalScheduler`].
#[derive(Error, Debug, PartialEq, Clone)]
pub enum SchedulerError {
    #[error("Interval period must be greater than zero")]
    InvalidPeriod,

    #[error("Scheduler is still active, stop it before resetting")]
    StillActive,
}

/// Callback invoked on every tick.
///
/// A returned error is logged and the schedule keeps running; stopping the
/// series is the callback owner's call, via [`IntervalScheduler::stop`].
pub type TickCallback = Box<dyn FnMut() -> Result<()> + Send + 'static>;

/// Mutable scheduling state, one record per scheduler instance.
struct SchedulerState {
    /// True while a timer is pending
    active: bool,
    /// Anchor instant; all target fire times are baseline + k * period
    baseline: Option<Instant>,
    /// True until the first tick has been processed (fired or skipped)
    first_tick: bool,
    /// Handle of the currently pending single-shot timer
    pending: Option<TimerHandle>,
    /// Bumped by `stop` so an in-flight tick knows not to re-arm
    epoch: u64,
    stats: TickStats,
}

/// Periodic scheduler that compensates for callback execution time.
///
/// `start` fires the callback (optionally immediately), then arms a
/// single-shot timer for the remainder of the period; each firing repeats
/// the cycle. Because the next wake time is computed from a fixed baseline
/// rather than from "now", the invocation instants stay on an exact
/// arithmetic grid instead of drifting later with every tick.
///
/// The scheduler is cheap to clone; clones share state, so a callback can
/// hold a clone of its own scheduler and call [`stop`](Self::stop) on it.
#[derive(Clone)]
pub struct IntervalScheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl IntervalScheduler {
    pub fn new() -> Self {
        let config = SchedulerConfig::default();
        let metrics = TickMetrics::new(
            config.metrics_window,
            config.slow_threshold.unwrap_or(config.period),
        );

        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                active: false,
                baseline: None,
                first_tick: true,
                pending: None,
                epoch: 0,
                stats: TickStats::new(metrics),
            })),
        }
    }

    /// Begin (or resume) periodic invocation of `callback` every `period`.
    ///
    /// With `run_immediately` the callback fires synchronously before the
    /// first delay is computed; otherwise the first invocation comes one full
    /// period after this call. Must be called from within a tokio runtime.
    ///
    /// After a [`stop`](Self::stop), calling `start` again resumes from the
    /// old baseline anchor: the first tick fires immediately and, if the
    /// scheduler was stopped for longer than a period, a burst of
    /// zero-delay ticks catches back up onto the original grid. Call
    /// [`reset`](Self::reset) first for a clean restart.
    pub fn start<F>(&self, callback: F, period: Duration, run_immediately: bool) -> Result<TimerHandle>
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let config = SchedulerConfig {
            period,
            run_immediately,
            ..Default::default()
        };
        self.start_boxed(Box::new(callback), &config)
    }

    /// [`start`](Self::start) driven by a [`SchedulerConfig`] record.
    pub fn start_with_config<F>(&self, callback: F, config: &SchedulerConfig) -> Result<TimerHandle>
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        self.start_boxed(Box::new(callback), config)
    }

    fn start_boxed(&self, callback: TickCallback, config: &SchedulerConfig) -> Result<TimerHandle> {
        if config.period.is_zero() {
            return Err(SchedulerError::InvalidPeriod.into());
        }

        {
            let mut st = Self::lock(&self.state);

            // Keep the one-pending-timer invariant: a second `start` replaces
            // the running schedule instead of forking it.
            if let Some(previous) = st.pending.take() {
                warn!("⏭️ start() while a timer is pending, replacing the schedule");
                previous.cancel();
                st.epoch = st.epoch.wrapping_add(1);
            }

            st.stats.metrics = TickMetrics::new(
                config.metrics_window,
                config.slow_threshold.unwrap_or(config.period),
            );
        }

        info!(
            "🔄 Interval scheduler starting: period {:?}, run_immediately={}",
            config.period, config.run_immediately
        );

        match Self::tick(&self.state, callback, config.period, config.run_immediately, None) {
            Some(handle) => Ok(handle),
            // Only reachable when another owner stopped the scheduler while
            // the initial callback was still running.
            None => bail!("scheduler was stopped while the initial tick was running"),
        }
    }

    /// Halt periodic invocation.
    ///
    /// Cancels the pending timer and marks the scheduler inactive. Safe to
    /// call repeatedly and from inside the callback; stopping an inactive
    /// scheduler is a no-op. The baseline anchor and first-tick flag are NOT
    /// reset, see [`start`](Self::start) for the restart semantics.
    pub fn stop(&self) {
        let mut st = Self::lock(&self.state);
        if !st.active {
            return;
        }

        if let Some(handle) = st.pending.take() {
            handle.cancel();
        }
        st.active = false;
        // An in-flight tick compares its epoch stamp before re-arming, so a
        // stop landing mid-callback still ends the series.
        st.epoch = st.epoch.wrapping_add(1);

        info!("🛑 Interval scheduler stopped");
    }

    /// Forget the baseline anchor and first-tick state.
    ///
    /// The next `start` then behaves like the very first one: fresh baseline,
    /// first-tick policy applies again, no catch-up burst. Fails while the
    /// scheduler is active.
    pub fn reset(&self) -> Result<()> {
        let mut st = Self::lock(&self.state);
        if st.active {
            return Err(SchedulerError::StillActive.into());
        }

        st.baseline = None;
        st.first_tick = true;
        debug!("🧹 Scheduler baseline reset");
        Ok(())
    }

    /// True while a timer is pending.
    pub fn is_active(&self) -> bool {
        Self::lock(&self.state).active
    }

    /// Snapshot of the cumulative tick statistics.
    pub fn stats(&self) -> TickStats {
        Self::lock(&self.state).stats.clone()
    }

    /// One full tick: decide whether to fire the callback, advance the
    /// baseline by exactly one period, and arm the next single-shot timer
    /// for the time remaining until the new anchor.
    ///
    /// `armed_epoch` is the epoch stamp captured when the firing timer was
    /// armed; `None` on the synchronous path from `start`. Returns the new
    /// timer handle, or `None` when a stop suppressed the re-arm.
    fn tick(
        state: &Arc<Mutex<SchedulerState>>,
        mut callback: TickCallback,
        period: Duration,
        run_immediately: bool,
        armed_epoch: Option<u64>,
    ) -> Option<TimerHandle> {
        let (should_fire, epoch) = {
            let mut st = Self::lock(state);

            // A timer wakeup can race with `stop`; the epoch stamp tells a
            // stale firing from a live one.
            if let Some(armed) = armed_epoch {
                if st.epoch != armed {
                    debug!("⏭️ Stale timer fired after stop, ignoring");
                    return None;
                }
            }

            if st.baseline.is_none() {
                st.baseline = Some(Instant::now());
            }

            // First tick fires only on request; every later tick fires.
            let should_fire = (run_immediately && st.first_tick) || !st.first_tick;
            if st.first_tick {
                st.first_tick = false;
            }

            st.stats.total_ticks += 1;
            st.stats.last_tick_started = Some(Instant::now());

            (should_fire, st.epoch)
        };

        // The callback runs without the state lock held: it may own a clone
        // of this scheduler and call `stop` on it.
        let mut callback_took = None;
        if should_fire {
            let started = Instant::now();
            if let Err(e) = callback() {
                error!("❌ Tick callback failed: {:#}", e);
            }
            callback_took = Some(started.elapsed());
        }

        // Read after the callback so its execution time counts against the
        // next delay.
        let end = Instant::now();

        let mut st = Self::lock(state);

        if let Some(took) = callback_took {
            st.stats.total_runs += 1;
            st.stats.total_callback_time += took;
            st.stats.metrics.record(took);

            if took > period {
                warn!(
                    "⚠️ Tick callback took {:?} (longer than period {:?})",
                    took, period
                );
            }
            if st.stats.metrics.is_consistently_slow() {
                warn!(
                    "🐢 Callbacks consistently slower than {:?}, scheduler cannot keep up",
                    st.stats.metrics.slow_threshold()
                );
            }
        }
        st.stats.last_tick_completed = Some(end);

        if st.epoch != epoch {
            debug!("🛑 Stop requested while the tick was running, not rescheduling");
            return None;
        }

        let Some(baseline) = st.baseline else {
            // Unreachable: the baseline is set at the top of every tick and
            // only cleared by `reset` while inactive.
            return None;
        };

        // Advance the anchor by exactly one period, never by elapsed time.
        // Target instants stay on the sequence baseline_0 + k*period, so
        // jitter in one tick does not leak into the next.
        let next_target = baseline + period;
        st.baseline = Some(next_target);

        // Clamped at zero: a callback that overran the period makes the next
        // tick fire as soon as possible.
        let delay = next_target.saturating_duration_since(end);
        if delay.is_zero() {
            debug!("⚡ Running behind schedule, next tick fires immediately");
        } else {
            debug!("⏱️ Next tick in {:?}", delay);
        }

        let next_state = Arc::clone(state);
        let handle = timer::schedule_after(delay, move || {
            Self::tick(&next_state, callback, period, false, Some(epoch));
        });

        st.pending = Some(handle.clone());
        st.active = true;

        Some(handle)
    }

    fn lock(state: &Arc<Mutex<SchedulerState>>) -> MutexGuard<'_, SchedulerState> {
        state.lock().expect("scheduler state lock poisoned")
    }
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new()
    }
}
