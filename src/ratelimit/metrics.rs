//! Activity snapshots for rate-limited sites.
//!
//! ```text
//!     Site Metrics:
//!     ┌─────────────────────────────────────┐
//!     │  Calls: 12000   Fires: 12           │
//!     │  Suppressed: 11988 (99.90%)         │
//!     │  Interval: 1000ms                   │
//!     └─────────────────────────────────────┘
//! ```

use std::fmt;

/// Point-in-time view of one site.
///
/// For a bare [`RateLimiter`](crate::RateLimiter) every call is either a fire
/// or a suppression, so `total_calls == total_fires + total_suppressed`.
/// Counters built on top of a limiter report their own call count, which is
/// identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteMetrics {
    /// Calls observed by the site.
    pub total_calls: u64,

    /// Calls that fired.
    pub total_fires: u64,

    /// Calls that fell inside a window.
    pub total_suppressed: u64,

    /// Timestamp of the most recent fire, 0 if never fired.
    pub last_fire_ms: u64,

    /// Configured interval.
    pub interval_ms: u64,
}

impl SiteMetrics {
    /// Fraction of calls that fired, 0.0 when there were no calls.
    #[inline]
    pub fn fire_ratio(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_fires as f64 / self.total_calls as f64
        }
    }

    /// Fraction of calls that were suppressed.
    #[inline]
    pub fn suppression_ratio(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_suppressed as f64 / self.total_calls as f64
        }
    }

    /// Whether the site has ever fired.
    #[inline]
    pub fn has_fired(&self) -> bool {
        self.total_fires > 0
    }

    /// Human-readable multi-line summary.
    ///
    /// ```text
    /// Site Metrics:
    /// ├─ Calls: 1200
    /// ├─ Fires: 2 (0.17%)
    /// ├─ Suppressed: 1198 (99.83%)
    /// └─ Interval: 1000ms (last fire at 1712345678901)
    /// ```
    pub fn summary(&self) -> String {
        format!(
            "Site Metrics:\n\
             ├─ Calls: {}\n\
             ├─ Fires: {} ({:.2}%)\n\
             ├─ Suppressed: {} ({:.2}%)\n\
             └─ Interval: {}ms (last fire at {})",
            self.total_calls,
            self.total_fires,
            self.fire_ratio() * 100.0,
            self.total_suppressed,
            self.suppression_ratio() * 100.0,
            self.interval_ms,
            self.last_fire_ms,
        )
    }
}

impl fmt::Display for SiteMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
