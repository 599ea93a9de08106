//! Periodic-reset admission counter.
//!
//! Tracks units admitted in the current window and zeroes the count when the
//! window elapses. Capacity comes back all at once at each reset, independent
//! of individual completions.
//!
//! # Reset Task
//!
//! ```text
//! start() ──► spawn ──► loop {
//!                         select! {
//!                           cancelled ──► exit
//!                           tick(window) ──► count := 0
//!                         }
//!                       }
//! stop()  ──► take task slot ──► cancel ──► await JoinHandle
//! ```
//!
//! The task slot is taken under the lock before waiting, so at most one
//! caller ever waits on a given task and `stop` on an empty slot returns
//! immediately.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{LimitReachedError, LimiterError, Lifecycle, RateLimiter, RequestContext};
use crate::metrics;
use crate::utils::duration_millis;

/// Handle to a running reset task.
struct ResetTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Counter plus reset task, shared by [`PeriodicLimiter`] and
/// [`GateLimiter`](super::GateLimiter).
pub(crate) struct ResetCounter {
    capacity: u32,
    window: Duration,
    count: Arc<AtomicU64>,
    resets: Arc<AtomicU64>,
    task: Mutex<Option<ResetTask>>,
}

impl ResetCounter {
    pub(crate) fn new(window: Duration, capacity: u32) -> Result<Self, LimiterError> {
        if window.is_zero() {
            return Err(LimiterError::ZeroWindow);
        }

        Ok(Self {
            capacity,
            window,
            count: Arc::new(AtomicU64::new(0)),
            resets: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        })
    }

    pub(crate) fn is_limit_reached(&self) -> bool {
        self.count.load(Ordering::Acquire) >= u64::from(self.capacity)
    }

    pub(crate) fn inc(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn try_acquire(&self) -> bool {
        let capacity = u64::from(self.capacity);
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < capacity).then_some(count + 1)
            })
            .is_ok()
    }

    pub(crate) fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    pub(crate) fn window(&self) -> Duration {
        self.window
    }

    pub(crate) fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::Acquire)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    pub(crate) fn start(&self) -> Result<(), LimiterError> {
        let mut slot = self.task.lock();
        if slot.is_some() {
            trace!("Reset task already running");
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| LimiterError::NoRuntime)?;
        let cancel = CancellationToken::new();
        let handle = runtime.spawn(reset_loop(
            self.count.clone(),
            self.resets.clone(),
            self.window,
            cancel.clone(),
        ));

        *slot = Some(ResetTask { cancel, handle });
        debug!(
            window_ms = duration_millis(self.window),
            capacity = self.capacity,
            "Reset task started"
        );
        Ok(())
    }

    pub(crate) async fn stop(&self) {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return;
        };

        task.cancel.cancel();
        if let Err(e) = task.handle.await
            && !e.is_cancelled()
        {
            warn!(error = %e, "Reset task terminated abnormally");
        }
        debug!("Reset task stopped");
    }
}

impl Drop for ResetCounter {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

/// Zero `count` every `window` until cancelled.
async fn reset_loop(
    count: Arc<AtomicU64>,
    resets: Arc<AtomicU64>,
    window: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(window);
    // A stalled runtime must not fire a burst of catch-up resets.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // Skip the first immediate tick

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let previous = count.swap(0, Ordering::AcqRel);
                resets.fetch_add(1, Ordering::AcqRel);
                metrics::record_counter_reset();
                trace!(previous, "Admission counter reset");
            }
        }
    }
}

/// Fixed-capacity counter reset to zero every `window`.
///
/// The reset task is not started by [`new`](Self::new); call
/// [`Lifecycle::start`]. Without it the count only grows.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use httpware::rate_limit::{Lifecycle, PeriodicLimiter};
///
/// # async fn run() -> Result<(), httpware::rate_limit::LimiterError> {
/// let limiter = PeriodicLimiter::new(Duration::from_secs(1), 100)?;
/// limiter.start()?;
///
/// if !limiter.is_limit_reached() {
///     limiter.inc();
///     // ... do the work ...
/// }
///
/// limiter.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct PeriodicLimiter {
    counter: ResetCounter,
}

impl PeriodicLimiter {
    /// Create a stopped limiter admitting `capacity` units per `window`.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::ZeroWindow`] if `window` is zero.
    pub fn new(window: Duration, capacity: u32) -> Result<Self, LimiterError> {
        Ok(Self {
            counter: ResetCounter::new(window, capacity)?,
        })
    }

    /// True when the in-use count is at or above capacity.
    pub fn is_limit_reached(&self) -> bool {
        self.counter.is_limit_reached()
    }

    /// Count one more unit. Capacity is not enforced here.
    pub fn inc(&self) {
        self.counter.inc();
    }

    /// Admit and count in one atomic step.
    ///
    /// Returns `false` without counting when capacity is exhausted. Unlike
    /// `check` followed by `begin`, concurrent callers can never push the
    /// count past capacity.
    pub fn try_acquire(&self) -> bool {
        self.counter.try_acquire()
    }

    /// Units counted since the last reset.
    pub fn count(&self) -> u64 {
        self.counter.count()
    }

    /// Units left before the limit is reached.
    pub fn remaining(&self) -> u64 {
        u64::from(self.counter.capacity()).saturating_sub(self.counter.count())
    }

    pub fn capacity(&self) -> u32 {
        self.counter.capacity()
    }

    pub fn window(&self) -> Duration {
        self.counter.window()
    }

    /// Resets performed by the background task over the limiter's lifetime.
    pub fn reset_count(&self) -> u64 {
        self.counter.reset_count()
    }
}

impl RateLimiter for PeriodicLimiter {
    fn check(&self, _ctx: &RequestContext<'_>) -> Result<(), LimitReachedError> {
        if self.is_limit_reached() {
            return Err(LimitReachedError);
        }
        Ok(())
    }

    fn begin(&self, _ctx: &RequestContext<'_>) {
        self.inc();
    }

    // Capacity is freed by the reset task, not by completions.
    fn end(&self, _ctx: &RequestContext<'_>) {}
}

impl Lifecycle for PeriodicLimiter {
    fn start(&self) -> Result<(), LimiterError> {
        self.counter.start()
    }

    fn stop(&self) -> impl Future<Output = ()> + Send {
        self.counter.stop()
    }

    fn is_running(&self) -> bool {
        self.counter.is_running()
    }
}

impl std::fmt::Debug for PeriodicLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicLimiter")
            .field("capacity", &self.capacity())
            .field("window", &self.window())
            .field("count", &self.count())
            .field("running", &self.is_running())
            .finish()
    }
}
