//! # Site Configuration
//!
//! Settings of the per-site primitives (the interval between fires and the
//! memory ordering of the lock-free fast path) and of the printer (the
//! interval its macros apply and the header layout of printed lines).
//!
//! ```text
//!     SiteConfig
//!     ┌──────────────────────────────┐
//!     │ interval_ms: 1000            │ ← minimum gap between fires
//!     │ ordering: AcquireRelease     │ ← fast-path atomics
//!     └──────────────────────────────┘
//!
//!     PrinterConfig
//!     ┌──────────────────────────────┐
//!     │ interval_ms: 1000            │ ← applied by the macros
//!     │ time_header: None/4.3/5.6    │ ← timestamp prefix
//!     │ newline: true                │ ← append "\n"
//!     └──────────────────────────────┘
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::Ordering;

use crate::error::ConfigError;

/// Default interval between fires of a rate-limited site, in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Environment variable overriding [`DEFAULT_INTERVAL_MS`].
pub const ENV_INTERVAL: &str = "QP_RATELIMIT_INTERVAL";

/// Environment variable selecting the [`TimeHeader`] (`none`, `4_3`, `5_6`).
pub const ENV_TIME_HEADER: &str = "QP_TIME_HEADER";

/// Environment variable controlling the trailing newline (`0` disables it).
pub const ENV_NEWLINE: &str = "QP_NL";

/// Memory ordering strategy for the atomic fast path.
///
/// Only the unlocked pre-check and the final store of the fire timestamp use
/// these orderings. The re-check under the site lock is always correct
/// because the mutex itself synchronizes.
///
/// ```rust
/// use qprint::{MemoryOrdering, SiteConfig};
///
/// let config = SiteConfig::default().with_ordering(MemoryOrdering::Sequential);
/// assert_eq!(config.ordering, MemoryOrdering::Sequential);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryOrdering {
    /// Fastest. The pre-check may observe a stale timestamp and take the lock
    /// needlessly, which is harmless.
    Relaxed,

    /// Acquire loads and release stores (default).
    #[default]
    AcquireRelease,

    /// Sequential consistency for every fast-path access.
    Sequential,
}

impl MemoryOrdering {
    #[inline(always)]
    pub(crate) fn load(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Acquire,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    #[inline(always)]
    pub(crate) fn store(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Release,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    #[inline(always)]
    pub(crate) fn rmw(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::AcqRel,
            Self::Sequential => Ordering::SeqCst,
        }
    }
}

/// Timestamp prefix written in front of the location tag.
///
/// ```text
///     None    →  "demo.rs(12): hello"
///     Millis  →  "[0042.117] demo.rs(12): hello"        (4 digits . 3 digits)
///     Micros  →  "[00042.117503] demo.rs(12): hello"    (5 digits . 6 digits)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeHeader {
    /// Location tag only.
    #[default]
    None,
    /// Seconds modulo 10 000 and milliseconds.
    Millis,
    /// Seconds modulo 100 000 and microseconds.
    Micros,
}

impl TimeHeader {
    /// Width of the bracketed timestamp including the trailing space.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Millis => 11,
            Self::Micros => 15,
        }
    }

    /// Returns true when no timestamp is written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for TimeHeader {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "0" => Ok(Self::None),
            "4_3" | "4.3" | "millis" | "1" => Ok(Self::Millis),
            "5_6" | "5.6" | "micros" | "2" => Ok(Self::Micros),
            other => Err(ConfigError::UnknownTimeHeader(other.to_string())),
        }
    }
}

impl fmt::Display for TimeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Millis => write!(f, "4_3"),
            Self::Micros => write!(f, "5_6"),
        }
    }
}

/// Per-site behaviour.
///
/// `interval_ms` is the minimum number of milliseconds that must elapse
/// (strictly more than) between two fires of the same site. Zero is valid and
/// lets a site fire once per distinct millisecond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Minimum gap between fires.
    pub interval_ms: u64,

    /// Ordering used by the unlocked pre-check.
    pub ordering: MemoryOrdering,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            ordering: MemoryOrdering::AcquireRelease,
        }
    }
}

impl SiteConfig {
    /// Creates a configuration firing at most once per `interval_ms`.
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ordering: MemoryOrdering::AcquireRelease,
        }
    }

    /// One fire per second.
    pub const fn per_second() -> Self {
        Self::new(1000)
    }

    /// One fire per minute.
    pub const fn per_minute() -> Self {
        Self::new(60_000)
    }

    /// Sets the memory ordering strategy.
    pub fn with_ordering(mut self, ordering: MemoryOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the interval.
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Upper bound on fires per second implied by the interval.
    ///
    /// ```rust
    /// use qprint::SiteConfig;
    ///
    /// assert_eq!(SiteConfig::new(250).max_fires_per_second(), 4.0);
    /// ```
    pub fn max_fires_per_second(&self) -> f64 {
        if self.interval_ms == 0 {
            1000.0
        } else {
            1000.0 / self.interval_ms as f64
        }
    }
}

/// Configuration of a [`Printer`](crate::Printer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    /// Interval passed to macro sites and rate-limited prints.
    pub interval_ms: u64,

    /// Timestamp prefix.
    pub time_header: TimeHeader,

    /// Append a newline to every line.
    pub newline: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            time_header: TimeHeader::None,
            newline: true,
        }
    }
}

impl PrinterConfig {
    /// Builds a configuration from the `QP_*` environment variables, falling
    /// back to defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_INTERVAL) {
            config.interval_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_INTERVAL,
                        value: raw.clone(),
                    })?;
        }
        if let Some(raw) = lookup(ENV_TIME_HEADER) {
            config.time_header = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_NEWLINE) {
            config.newline = !matches!(raw.trim(), "0" | "false" | "off" | "");
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the timestamp prefix.
    pub fn with_time_header(mut self, header: TimeHeader) -> Self {
        self.time_header = header;
        self
    }

    /// Sets the interval applied by the macros.
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Enables or disables the trailing newline.
    pub fn with_newline(mut self, newline: bool) -> Self {
        self.newline = newline;
        self
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval exceeds one day, which is almost
    /// certainly a unit mistake (seconds vs. milliseconds are both common).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms > MAX_INTERVAL_MS {
            return Err(ConfigError::IntervalTooLarge {
                interval_ms: self.interval_ms,
                max_ms: MAX_INTERVAL_MS,
            });
        }
        Ok(())
    }
}

/// Largest accepted interval: one day.
pub const MAX_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;
