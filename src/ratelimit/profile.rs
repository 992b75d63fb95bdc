//! # Region Profiling
//!
//! A [`Profiler`] times a region of code on every pass and, once per interval,
//! reports how often the region ran and how long it took.
//!
//! ```text
//!     let timer = PROFILE.start();        ── begin_ns
//!     ... region ...
//!     timer.finish()                      ── end_ns
//!            │
//!            ▼
//!     lock(site)
//!       usage += end - begin
//!       count += 1
//!       inst_max = max(inst_max, end - begin)
//!       fire? ──No──► None
//!         │
//!        Yes
//!         ▼
//!       snapshot window, inst_max = 0 ──► Some(ProfileReport)
//! ```
//!
//! The accumulation and the fire decision share one lock so that a report
//! always covers a consistent window.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::{
    clock::{Clock, MonotonicClock},
    config::DEFAULT_INTERVAL_MS,
    core::RateLimiter,
    counter::div_rem,
};

/// Statistics for one profiling window.
///
/// `Display` renders the classic one-line form:
///
/// ```text
/// calls=11 10/sec usage=0ms 22us/sec inst_avg_dur=2200ns long_avg_dur=2090ns instmax=4000ns
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileReport {
    /// Passes through the region since the profiler was created.
    pub total_calls: u64,
    /// Passes per second during the window.
    pub call_rate: u64,
    /// Time spent in the region since the profiler was created.
    pub total_usage_ns: u64,
    /// Microseconds spent in the region per second of wall time during the
    /// window.
    pub usage_per_sec_us: u64,
    /// Average pass duration during the window.
    pub inst_avg_ns: u64,
    /// Average pass duration since the profiler was created.
    pub long_avg_ns: u64,
    /// Longest single pass during the window.
    pub inst_max_ns: u64,
    /// Length of the window.
    pub elapsed_ms: u64,
}

impl ProfileReport {
    /// Total usage in whole milliseconds.
    pub fn total_usage_ms(&self) -> u64 {
        div_rem(self.total_usage_ns, 1_000_000).0
    }
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "calls={} {}/sec usage={}ms {}us/sec inst_avg_dur={}ns long_avg_dur={}ns instmax={}ns",
            self.total_calls,
            self.call_rate,
            self.total_usage_ms(),
            self.usage_per_sec_us,
            self.inst_avg_ns,
            self.long_avg_ns,
            self.inst_max_ns,
        )
    }
}

#[derive(Debug, Default)]
struct Usage {
    usage_ns: u64,
    last_usage_ns: u64,
    count: u64,
    last_count: u64,
    inst_max_ns: u64,
}

/// Accumulates region durations for one site.
///
/// ```rust
/// use qprint::Profiler;
///
/// static PROFILE: Profiler = Profiler::new();
///
/// let (sum, report) = PROFILE.time(|| (0..100u64).sum::<u64>());
/// assert_eq!(sum, 4950);
/// assert_eq!(report.expect("first pass fires").total_calls, 1);
/// ```
pub struct Profiler<C = MonotonicClock> {
    limiter: RateLimiter<C>,
    usage: Mutex<Usage>,
}

impl Profiler<MonotonicClock> {
    /// Creates a profiler reporting at most once per second.
    pub const fn new() -> Self {
        Self::with_interval(DEFAULT_INTERVAL_MS)
    }

    /// Creates a profiler reporting at most once per `interval_ms`.
    pub const fn with_interval(interval_ms: u64) -> Self {
        Self::with_clock(MonotonicClock, interval_ms)
    }
}

impl Default for Profiler<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Profiler<C> {
    /// Creates a profiler reading time from `clock`.
    pub const fn with_clock(clock: C, interval_ms: u64) -> Self {
        Self {
            limiter: RateLimiter::with_clock(clock, interval_ms),
            usage: Mutex::new(Usage {
                usage_ns: 0,
                last_usage_ns: 0,
                count: 0,
                last_count: 0,
                inst_max_ns: 0,
            }),
        }
    }

    /// The limiter deciding when this profiler reports.
    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    /// Passes recorded so far.
    pub fn total_calls(&self) -> u64 {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }

    /// Longest pass in the current window.
    pub fn inst_max_ns(&self) -> u64 {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .inst_max_ns
    }
}

impl<C: Clock> Profiler<C> {
    /// Starts timing one pass through the region.
    #[inline]
    pub fn start(&self) -> RegionTimer<'_, C> {
        RegionTimer {
            profiler: self,
            begin_ns: self.limiter.clock().now_ns(),
        }
    }

    /// Records one pass of `duration_ns` and reports if the site fires.
    #[inline]
    pub fn record(&self, duration_ns: u64) -> Option<ProfileReport> {
        self.record_every(duration_ns, self.limiter.interval_ms())
    }

    /// [`record`](Self::record) with an explicit interval.
    pub fn record_every(&self, duration_ns: u64, interval_ms: u64) -> Option<ProfileReport> {
        let mut usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        usage.usage_ns = usage.usage_ns.saturating_add(duration_ns);
        usage.count += 1;
        usage.inst_max_ns = usage.inst_max_ns.max(duration_ns);

        let elapsed_ms = self.limiter.should_fire(interval_ms);
        if elapsed_ms == 0 {
            return None;
        }

        let total_usage_ns = usage.usage_ns;
        let total_calls = usage.count;
        let delta_usage = total_usage_ns - usage.last_usage_ns;
        let delta_count = total_calls - usage.last_count;
        let inst_max_ns = usage.inst_max_ns;
        usage.last_usage_ns = total_usage_ns;
        usage.last_count = total_calls;
        usage.inst_max_ns = 0;
        drop(usage);

        Some(ProfileReport {
            total_calls,
            call_rate: div_rem(delta_count.saturating_mul(1000), elapsed_ms).0,
            total_usage_ns,
            usage_per_sec_us: div_rem(delta_usage, elapsed_ms).0,
            inst_avg_ns: div_rem(delta_usage, delta_count).0,
            long_avg_ns: div_rem(total_usage_ns, total_calls).0,
            inst_max_ns,
            elapsed_ms,
        })
    }

    /// Runs `f` as one pass through the region.
    pub fn time<F, R>(&self, f: F) -> (R, Option<ProfileReport>)
    where
        F: FnOnce() -> R,
    {
        let timer = self.start();
        let out = f();
        (out, timer.finish())
    }
}

impl<C> fmt::Debug for Profiler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Profiler")
            .field("count", &usage.count)
            .field("usage_ns", &usage.usage_ns)
            .field("inst_max_ns", &usage.inst_max_ns)
            .finish()
    }
}

/// One in-flight pass through a profiled region.
#[must_use = "a region timer records nothing unless finished"]
#[derive(Debug)]
pub struct RegionTimer<'a, C = MonotonicClock> {
    profiler: &'a Profiler<C>,
    begin_ns: u64,
}

impl<C: Clock> RegionTimer<'_, C> {
    /// Nanoseconds since the pass started.
    pub fn elapsed_ns(&self) -> u64 {
        self.profiler
            .limiter
            .clock()
            .now_ns()
            .saturating_sub(self.begin_ns)
    }

    /// Ends the pass and records its duration.
    pub fn finish(self) -> Option<ProfileReport> {
        let duration_ns = self.elapsed_ns();
        self.profiler.record(duration_ns)
    }
}
