//! # Clock Sources (clock.rs)
//!
//! Every site reads time through the [`Clock`] trait. The default
//! [`MonotonicClock`] is zero-sized so that limiters using it can be built in a
//! `const` context and stored in a `static`.
//!
//! ```text
//!     MonotonicClock:
//!
//!     process start ──► capture (Instant, wall-clock epoch ms)
//!                                 │
//!     now_ms() ─────────► epoch_ms + Instant::elapsed()
//! ```
//!
//! ## Known limitations
//!
//! Timestamps are plain `u64` values and limiters subtract them with wrapping
//! arithmetic. A clock that moves backwards (for example a [`ManualClock`]
//! that is set to an earlier value, or an embedder's wall-clock source) makes
//! the difference wrap to a huge value and causes one spurious fire. A `u64`
//! millisecond counter does not wrap in practice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// Wall-clock epoch captured once, advanced by a monotonic Instant afterwards.
static START_TIME_BASE: OnceLock<(Instant, u64)> = OnceLock::new();

#[inline(always)]
fn time_base() -> &'static (Instant, u64) {
    START_TIME_BASE.get_or_init(|| {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        (Instant::now(), epoch_ms)
    })
}

/// Returns the current time in milliseconds since UNIX epoch.
///
/// The value never goes backwards within a process.
///
/// ```rust
/// use qprint::current_time_ms;
///
/// let a = current_time_ms();
/// let b = current_time_ms();
/// assert!(b >= a);
/// ```
#[inline(always)]
pub fn current_time_ms() -> u64 {
    let (start, base_ms) = time_base();
    base_ms.saturating_add(start.elapsed().as_millis() as u64)
}

/// Returns the current time in microseconds since UNIX epoch.
#[inline(always)]
pub fn current_time_us() -> u64 {
    let (start, base_ms) = time_base();
    base_ms
        .saturating_mul(1000)
        .saturating_add(start.elapsed().as_micros() as u64)
}

/// Returns the current time in nanoseconds since UNIX epoch.
#[inline(always)]
pub fn current_time_ns() -> u64 {
    let (start, base_ms) = time_base();
    base_ms
        .saturating_mul(1_000_000)
        .saturating_add(start.elapsed().as_nanos() as u64)
}

/// A source of timestamps.
///
/// Implementations must be cheap to call; sites read the clock on every
/// invocation.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary, fixed epoch.
    fn now_ms(&self) -> u64;

    /// Nanoseconds since the same epoch.
    fn now_ns(&self) -> u64;
}

/// Default clock: wall-clock epoch at process start plus monotonic elapsed time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now_ms(&self) -> u64 {
        current_time_ms()
    }

    #[inline(always)]
    fn now_ns(&self) -> u64 {
        current_time_ns()
    }
}

/// A clock that only moves when told to.
///
/// Useful for deterministic tests and for embedders that already keep their
/// own tick counter. Share it with a limiter through an `Arc`.
///
/// ```rust
/// use std::sync::Arc;
/// use qprint::{Clock, ManualClock};
///
/// let clock = Arc::new(ManualClock::new(5_000));
/// clock.advance_ms(250);
/// assert_eq!(clock.now_ms(), 5_250);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start_ms`.
    pub const fn new(start_ms: u64) -> Self {
        Self {
            now_ns: AtomicU64::new(start_ms.saturating_mul(1_000_000)),
        }
    }

    /// Sets the current time. Setting an earlier value is allowed and
    /// simulates a non-monotonic source.
    pub fn set_ms(&self, ms: u64) {
        self.now_ns.store(ms.saturating_mul(1_000_000), Ordering::SeqCst);
    }

    /// Moves the clock forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance_ns(ms.saturating_mul(1_000_000));
    }

    /// Moves the clock forward by `ns` nanoseconds.
    pub fn advance_ns(&self, ns: u64) {
        self.now_ns.fetch_add(ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst) / 1_000_000
    }

    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline(always)]
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    #[inline(always)]
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline(always)]
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    #[inline(always)]
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

/// Cache-aligned wrapper so that a hot atomic does not share a line with the
/// site's lock and counters.
#[cfg(target_arch = "aarch64")]
#[repr(C, align(128))]
pub(crate) struct CacheAligned<T>(pub(crate) T);
#[cfg(not(target_arch = "aarch64"))]
#[repr(C, align(64))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

impl<T> CacheAligned<T> {
    #[inline(always)]
    pub(crate) const fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CacheAligned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
