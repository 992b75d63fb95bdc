//! # Core Rate Limiter
//!
//! A [`RateLimiter`] answers one question per call: has strictly more than
//! `interval_ms` elapsed since this site last fired? If so the call fires and
//! learns how long the window was.
//!
//! ```text
//!     should_fire(interval)
//!
//!     now - last_fire <= interval ──────────────────────────► 0 (no lock taken)
//!              │
//!              > interval
//!              ▼
//!        lock(site) ── re-check ── still > interval? ──No──► 0
//!                                        │
//!                                       Yes
//!                                        ▼
//!                              last_fire = now ──────────► elapsed ms
//! ```
//!
//! ## Double-Checked Locking
//!
//! The pre-check is a single atomic load, so callers inside the window never
//! touch the mutex. Only callers that see an expired window contend for the
//! per-site lock, which bounds contention to roughly one burst per interval.
//! Under the lock the timestamp is reloaded. A caller whose pre-check raced
//! with another fire sees the new timestamp and backs off, so exactly one of
//! a group of concurrent callers wins each window.
//!
//! A never-fired site holds timestamp zero. Zero is never compared as a time,
//! so the first call fires whatever the clock reads, even a tick counter that
//! starts at 0. A fire at clock reading 0 is stored as 1 to keep the marker
//! unambiguous.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use super::{
    clock::{CacheAligned, Clock, MonotonicClock},
    config::{MemoryOrdering, SiteConfig, DEFAULT_INTERVAL_MS},
    metrics::SiteMetrics,
};

/// `last_fire_ms` value of a site that has not fired since creation or reset.
const NEVER_FIRED: u64 = 0;

/// Per-site interval limiter.
///
/// Construct it once per call site and keep it for as long as the site
/// exists: in a `static`, a struct field, or a [`SiteRegistry`] entry.
///
/// ```rust
/// use qprint::RateLimiter;
///
/// static SITE: RateLimiter = RateLimiter::new();
///
/// // First call always fires and reports the (huge) time since "never".
/// assert!(SITE.fire() > 0);
/// // Immediately after, we are inside the window.
/// assert_eq!(SITE.fire(), 0);
/// ```
///
/// [`SiteRegistry`]: crate::SiteRegistry
pub struct RateLimiter<C = MonotonicClock> {
    /// Timestamp of the last fire in milliseconds, 0 when never fired.
    last_fire_ms: CacheAligned<AtomicU64>,

    /// Serializes the commit of a fire.
    lock: Mutex<()>,

    /// Interval used by [`fire`](Self::fire).
    interval_ms: u64,

    ordering: MemoryOrdering,

    total_fires: AtomicU64,
    total_suppressed: AtomicU64,

    clock: C,
}

impl RateLimiter<MonotonicClock> {
    /// Creates a limiter with the default one-second interval.
    pub const fn new() -> Self {
        Self::with_interval(DEFAULT_INTERVAL_MS)
    }

    /// Creates a limiter firing at most once per `interval_ms`.
    pub const fn with_interval(interval_ms: u64) -> Self {
        Self::with_clock(MonotonicClock, interval_ms)
    }

    /// Creates a limiter from a [`SiteConfig`].
    pub fn with_config(config: SiteConfig) -> Self {
        Self::with_clock(MonotonicClock, config.interval_ms).ordering(config.ordering)
    }
}

impl Default for RateLimiter<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RateLimiter<C> {
    /// Creates a limiter reading time from `clock`.
    pub const fn with_clock(clock: C, interval_ms: u64) -> Self {
        Self {
            last_fire_ms: CacheAligned::new(AtomicU64::new(0)),
            lock: Mutex::new(()),
            interval_ms,
            ordering: MemoryOrdering::AcquireRelease,
            total_fires: AtomicU64::new(0),
            total_suppressed: AtomicU64::new(0),
            clock,
        }
    }

    /// Replaces the fast-path memory ordering.
    pub fn ordering(mut self, ordering: MemoryOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Ordering of the unlocked pre-check.
    pub fn memory_ordering(&self) -> MemoryOrdering {
        self.ordering
    }

    /// Interval used by [`fire`](Self::fire).
    #[inline]
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Timestamp of the last fire, 0 if the site never fired.
    #[inline]
    pub fn last_fire_ms(&self) -> u64 {
        self.last_fire_ms.0.load(self.ordering.load())
    }

    /// The clock this limiter reads.
    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Decides whether a call at time `now` fires.
    ///
    /// Returns the milliseconds elapsed since the previous fire when it does,
    /// 0 otherwise. Callers that already hold a timestamp (the counters read
    /// the clock once per call) use this directly.
    #[inline]
    pub fn should_fire_at(&self, now: u64, interval_ms: u64) -> u64 {
        let seen = self.last_fire_ms.0.load(self.ordering.load());
        if seen != NEVER_FIRED && now.wrapping_sub(seen) <= interval_ms {
            self.total_suppressed.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        self.commit_fire(now, seen, interval_ms)
    }

    #[cold]
    fn commit_fire(&self, now: u64, seen: u64, interval_ms: u64) -> u64 {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        // The mutex orders us after any earlier commit.
        let current = self.last_fire_ms.0.load(Ordering::Relaxed);

        // Another caller fired with a later reading than ours.
        if current != seen && now < current {
            self.total_suppressed.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        let delta = now.wrapping_sub(current);
        if current != NEVER_FIRED && delta <= interval_ms {
            self.total_suppressed.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        // A fire always reports a non-zero elapsed time.
        let delta = delta.max(1);
        self.last_fire_ms.0.store(now.max(1), self.ordering.store());
        self.total_fires.fetch_add(1, self.ordering.rmw());
        trace!(now, delta, interval_ms, "site fired");
        delta
    }

    /// Forgets the last fire so the next call fires again. Counters are kept.
    pub fn reset(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.last_fire_ms.0.store(NEVER_FIRED, self.ordering.store());
    }

    /// Snapshot of this site's activity.
    pub fn metrics(&self) -> SiteMetrics {
        let ordering = self.ordering.load();
        let total_fires = self.total_fires.load(ordering);
        let total_suppressed = self.total_suppressed.load(ordering);
        SiteMetrics {
            total_calls: total_fires + total_suppressed,
            total_fires,
            total_suppressed,
            last_fire_ms: self.last_fire_ms.0.load(ordering),
            interval_ms: self.interval_ms,
        }
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Fires at most once per `interval_ms`.
    ///
    /// Returns the milliseconds elapsed since the previous fire, or 0 if the
    /// call falls inside the current window.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use qprint::{ManualClock, RateLimiter};
    ///
    /// let clock = Arc::new(ManualClock::new(10_000));
    /// let limiter = RateLimiter::with_clock(clock.clone(), 1000);
    ///
    /// assert_eq!(limiter.should_fire(100), 10_000);
    /// clock.advance_ms(100);
    /// assert_eq!(limiter.should_fire(100), 0);
    /// clock.advance_ms(1);
    /// assert_eq!(limiter.should_fire(100), 101);
    /// ```
    #[inline]
    pub fn should_fire(&self, interval_ms: u64) -> u64 {
        self.should_fire_at(self.clock.now_ms(), interval_ms)
    }

    /// [`should_fire`](Self::should_fire) with the configured interval.
    #[inline]
    pub fn fire(&self) -> u64 {
        self.should_fire(self.interval_ms)
    }

    /// Milliseconds until the site may fire again, 0 if it may fire now.
    pub fn remaining_ms(&self) -> u64 {
        let last = self.last_fire_ms();
        if last == NEVER_FIRED {
            return 0;
        }
        let elapsed = self.clock.now_ms().wrapping_sub(last);
        self.interval_ms.saturating_add(1).saturating_sub(elapsed)
    }
}

impl<C> fmt::Debug for RateLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval_ms", &self.interval_ms)
            .field("last_fire_ms", &self.last_fire_ms())
            .field("total_fires", &self.total_fires.load(Ordering::Relaxed))
            .finish()
    }
}

/// Evaluates true exactly once.
///
/// ```rust
/// use qprint::OnceFlag;
///
/// static FLAG: OnceFlag = OnceFlag::new();
///
/// assert!(FLAG.first());
/// assert!(!FLAG.first());
/// ```
#[derive(Debug, Default)]
pub struct OnceFlag {
    called: AtomicBool,
}

impl OnceFlag {
    /// Creates an unset flag.
    pub const fn new() -> Self {
        Self {
            called: AtomicBool::new(false),
        }
    }

    /// Returns true for the first caller only, across all threads.
    #[inline]
    pub fn first(&self) -> bool {
        !self.called.swap(true, Ordering::AcqRel)
    }

    /// Whether [`first`](Self::first) has already returned true.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.called.load(Ordering::Acquire)
    }
}
