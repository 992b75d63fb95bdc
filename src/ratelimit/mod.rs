//! # Rate Limiting Module
//!
//! Per-site state that decides when a diagnostic may fire and what to report
//! when it does.
//!
//! ## Module Structure
//!
//! ```text
//!     ratelimit/
//!     ├── mod.rs          (module organization)
//!     ├── clock.rs        (time sources)
//!     ├── config.rs       (intervals, orderings, header layout)
//!     ├── core.rs         (interval limiter and once flag)
//!     ├── counter.rs      (call counting and fixed-point rates)
//!     ├── profile.rs      (region timing)
//!     ├── registry.rs     (runtime-keyed sites)
//!     └── metrics.rs      (activity snapshots)
//! ```
//!
//! ## Layering
//!
//! ```text
//!     ┌──────────┐ ┌──────────┐ ┌──────────┐
//!     │ Registry │ │ Profiler │ │Histogram │
//!     └────┬─────┘ └────┬─────┘ └────┬─────┘
//!          └──────┬─────┘            │
//!                 ▼                  ▼
//!          ┌─────────────┐    ┌─────────────┐
//!          │ RateCounter │◄───┤  N buckets  │
//!          └──────┬──────┘    └─────────────┘
//!                 ▼
//!          ┌─────────────┐
//!          │ RateLimiter │ ◄── double-checked fire decision
//!          └──────┬──────┘
//!                 ▼
//!          ┌─────────────┐
//!          │    Clock    │
//!          └─────────────┘
//! ```

mod clock;
mod config;
mod core;
mod counter;
mod metrics;
mod profile;
mod registry;

/// Time sources.
pub use clock::{current_time_ms, current_time_ns, current_time_us, Clock, ManualClock, MonotonicClock};

/// Configuration types.
pub use config::{
    MemoryOrdering, PrinterConfig, SiteConfig, TimeHeader, DEFAULT_INTERVAL_MS, ENV_INTERVAL,
    ENV_NEWLINE, ENV_TIME_HEADER, MAX_INTERVAL_MS,
};

/// Interval limiter and once flag.
pub use self::core::{OnceFlag, RateLimiter};

/// Call counting with rate reports.
pub use counter::{div_rem, HistogramCounter, Rate, RateCounter, RateReport};

/// Activity snapshots.
pub use metrics::SiteMetrics;

/// Region profiling.
pub use profile::{ProfileReport, Profiler, RegionTimer};

/// Runtime-keyed sites.
pub use registry::{RegistryStats, SiteKey, SiteRegistry, DEFAULT_MAX_SITES};
