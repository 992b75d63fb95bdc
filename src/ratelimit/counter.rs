//! # Call Counting and Rate Reports
//!
//! A [`RateCounter`] counts every call at its site and, each time the
//! underlying [`RateLimiter`] fires, reports how many calls per second were
//! observed during the window that just closed.
//!
//! ```text
//!     calls:   ││││││││││││││││││││││││││││││││││││
//!     fires:   ▲                 ▲                 ▲
//!              │◄── window 1 ───►│◄── window 2 ───►│
//!                                 cnt=N rate=R.RRR/s
//! ```
//!
//! ## Fixed-Point Rates
//!
//! Rates use integer arithmetic only:
//!
//! ```text
//!     scaled = (count - last_reported) * 1_000_000 / elapsed_ms
//!     whole = scaled / 1000        thousandths = scaled % 1000
//! ```
//!
//! Multiplying by 10^6 before dividing by milliseconds yields calls per second
//! with three decimals. Every division follows the "zero divisor leaves the
//! dividend unchanged" convention, see [`div_rem`].

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use super::{
    clock::{Clock, MonotonicClock},
    config::{MemoryOrdering, SiteConfig, DEFAULT_INTERVAL_MS},
    core::RateLimiter,
    metrics::SiteMetrics,
};
use crate::error::{ConfigError, QpError};

/// Integer division returning `(quotient, remainder)`.
///
/// A zero divisor returns the dividend as both quotient and remainder instead
/// of panicking.
///
/// ```rust
/// use qprint::div_rem;
///
/// assert_eq!(div_rem(17, 5), (3, 2));
/// assert_eq!(div_rem(17, 0), (17, 17));
/// ```
#[inline]
pub const fn div_rem(dividend: u64, divisor: u64) -> (u64, u64) {
    if divisor == 0 {
        (dividend, dividend)
    } else {
        (dividend / divisor, dividend % divisor)
    }
}

/// Calls per second with three decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Rate {
    /// Whole calls per second.
    pub whole: u64,
    /// Thousandths of a call per second, always below 1000.
    pub thousandths: u64,
}

impl Rate {
    /// Rate of `calls` observed over `elapsed_ms`.
    ///
    /// ```rust
    /// use qprint::Rate;
    ///
    /// let rate = Rate::from_window(1000, 1000);
    /// assert_eq!(rate.to_string(), "1000.000");
    ///
    /// let rate = Rate::from_window(1, 3);
    /// assert_eq!(rate.to_string(), "333.333");
    /// ```
    pub const fn from_window(calls: u64, elapsed_ms: u64) -> Self {
        let scaled = calls.saturating_mul(1_000_000);
        let (per_sec_milli, _) = div_rem(scaled, elapsed_ms);
        let (whole, thousandths) = div_rem(per_sec_milli, 1000);
        Self { whole, thousandths }
    }

    /// Floating point view of the rate.
    pub fn as_f64(&self) -> f64 {
        self.whole as f64 + self.thousandths as f64 / 1000.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.whole, self.thousandths)
    }
}

/// What a [`RateCounter`] reports when its site fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateReport {
    /// Cumulative number of calls, including this one.
    pub count: u64,
    /// Calls since the previous fire.
    pub window_count: u64,
    /// Length of the window that just closed.
    pub elapsed_ms: u64,
    /// Calls per second over that window.
    pub rate: Rate,
}

impl fmt::Display for RateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cnt={} rate={}/s", self.count, self.rate)
    }
}

#[derive(Debug, Default)]
struct Counts {
    call_count: u64,
    last_reported_count: u64,
    last_call_ms: u64,
}

/// Counts calls at a site and reports the call rate once per interval.
///
/// ```rust
/// use qprint::RateCounter;
///
/// static SITE: RateCounter = RateCounter::new();
///
/// let report = SITE.record().expect("first call fires");
/// assert_eq!(report.count, 1);
/// assert!(SITE.record().is_none());
/// assert_eq!(SITE.call_count(), 2);
/// ```
pub struct RateCounter<C = MonotonicClock> {
    limiter: RateLimiter<C>,
    counts: Mutex<Counts>,
}

impl RateCounter<MonotonicClock> {
    /// Creates a counter with the default one-second interval.
    pub const fn new() -> Self {
        Self::with_interval(DEFAULT_INTERVAL_MS)
    }

    /// Creates a counter firing at most once per `interval_ms`.
    pub const fn with_interval(interval_ms: u64) -> Self {
        Self::with_clock(MonotonicClock, interval_ms)
    }

    /// Creates a counter from a [`SiteConfig`].
    pub fn with_config(config: SiteConfig) -> Self {
        Self::with_interval(config.interval_ms).ordering(config.ordering)
    }
}

impl Default for RateCounter<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RateCounter<C> {
    /// Creates a counter reading time from `clock`.
    pub const fn with_clock(clock: C, interval_ms: u64) -> Self {
        Self {
            limiter: RateLimiter::with_clock(clock, interval_ms),
            counts: Mutex::new(Counts {
                call_count: 0,
                last_reported_count: 0,
                last_call_ms: 0,
            }),
        }
    }

    /// Replaces the fast-path memory ordering of the underlying limiter.
    pub fn ordering(self, ordering: MemoryOrdering) -> Self {
        Self {
            limiter: self.limiter.ordering(ordering),
            counts: self.counts,
        }
    }

    /// The limiter deciding when this counter reports.
    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    /// Calls recorded so far.
    pub fn call_count(&self) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .call_count
    }

    /// Call count as of the last report.
    pub fn last_reported_count(&self) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_reported_count
    }

    /// Clock reading of the most recent call, 0 if never called.
    pub fn last_call_ms(&self) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_call_ms
    }

    /// Snapshot of this site's activity.
    pub fn metrics(&self) -> SiteMetrics {
        let mut metrics = self.limiter.metrics();
        metrics.total_calls = self.call_count();
        metrics
    }
}

impl<C: Clock> RateCounter<C> {
    /// Counts one call and reports the rate if the site fires.
    ///
    /// The call is counted whether or not the site fires. On a fire the
    /// report covers every call since the previous fire and the reported
    /// count becomes the new baseline.
    pub fn should_fire_and_report(&self, interval_ms: u64) -> Option<RateReport> {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.call_count = counts.call_count.wrapping_add(1);

        let now = self.limiter.clock().now_ms();
        counts.last_call_ms = now;
        let elapsed_ms = self.limiter.should_fire_at(now, interval_ms);
        if elapsed_ms == 0 {
            return None;
        }

        let window_count = counts.call_count - counts.last_reported_count;
        counts.last_reported_count = counts.call_count;
        let count = counts.call_count;
        drop(counts);

        Some(RateReport {
            count,
            window_count,
            elapsed_ms,
            rate: Rate::from_window(window_count, elapsed_ms),
        })
    }

    /// [`should_fire_and_report`](Self::should_fire_and_report) with the
    /// configured interval.
    #[inline]
    pub fn record(&self) -> Option<RateReport> {
        self.should_fire_and_report(self.limiter.interval_ms())
    }
}

impl<C> fmt::Debug for RateCounter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateCounter")
            .field("call_count", &self.call_count())
            .field("last_reported_count", &self.last_reported_count())
            .field("limiter", &self.limiter)
            .finish()
    }
}

/// A fixed set of independent counters selected by a bucket index.
///
/// Useful when one site wants a separate rate per value, for example per
/// error code or per queue.
///
/// ```rust
/// use qprint::HistogramCounter;
///
/// let hist = HistogramCounter::new(4).unwrap();
/// assert!(hist.record(2).unwrap().is_some());
/// assert!(hist.record(2).unwrap().is_none());
/// assert!(hist.record(3).unwrap().is_some());
/// assert!(hist.record(4).is_err());
/// ```
pub struct HistogramCounter<C = MonotonicClock> {
    buckets: Box<[RateCounter<C>]>,
}

impl HistogramCounter<MonotonicClock> {
    /// Creates `len` buckets with the default interval.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` is 0.
    pub fn new(len: usize) -> Result<Self, ConfigError> {
        Self::with_clock(MonotonicClock, len, DEFAULT_INTERVAL_MS)
    }
}

impl<C: Clone> HistogramCounter<C> {
    /// Creates `len` buckets sharing `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` is 0.
    pub fn with_clock(clock: C, len: usize, interval_ms: u64) -> Result<Self, ConfigError> {
        if len == 0 {
            return Err(ConfigError::ZeroCapacity("histogram buckets"));
        }
        let buckets = (0..len)
            .map(|_| RateCounter::with_clock(clock.clone(), interval_ms))
            .collect();
        Ok(Self { buckets })
    }
}

impl<C> HistogramCounter<C> {
    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always false; a histogram has at least one bucket.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The counter behind `bucket`.
    pub fn bucket(&self, bucket: usize) -> Option<&RateCounter<C>> {
        self.buckets.get(bucket)
    }
}

impl<C: Clock> HistogramCounter<C> {
    /// Counts one call in `bucket` and reports that bucket's rate if it fires.
    ///
    /// # Errors
    ///
    /// Returns [`QpError::BucketOutOfRange`] if `bucket >= len()`.
    pub fn record(&self, bucket: usize) -> Result<Option<RateReport>, QpError> {
        match self.buckets.get(bucket) {
            Some(counter) => Ok(counter.record()),
            None => {
                warn!(bucket, len = self.buckets.len(), "histogram bucket out of range");
                Err(QpError::BucketOutOfRange {
                    bucket,
                    len: self.buckets.len(),
                })
            }
        }
    }
}

impl<C> fmt::Debug for HistogramCounter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistogramCounter")
            .field("buckets", &self.buckets.len())
            .finish()
    }
}
