//! # qprint - Rate-Limited Quick Prints for Rust
//!
//! A small debug-printing library: location-tagged, optionally timestamped
//! lines that can be limited to one per interval per call site, with the call
//! rate observed in between reported on every line that makes it out.
//!
//! ## Why Rate Limiting?
//!
//! A debug print in a hot loop produces more output than anyone can read and
//! slows the loop down. Limiting each call site to one line per interval keeps
//! the output readable, and reporting the rate tells you what was skipped:
//!
//! ```text
//!     10 000 calls/s ──► qp_print_ratelimit!("queue full") ──► one line per second
//!
//!     src/pump.rs(88): cnt=10001 rate=10000.000/s: queue full
//!     src/pump.rs(88): cnt=20001 rate=10000.000/s: queue full
//! ```
//!
//! ## The Fire Decision
//!
//! Every call site owns a tiny piece of state: the time it last fired. A call
//! fires when strictly more than the interval has elapsed since then:
//!
//! ```text
//!     t=0      t=400    t=900    t=1001   t=1500   t=2002
//!      ▲        ·        ·        ▲        ·        ▲
//!     fire    skip     skip     fire     skip     fire      (interval 1000ms)
//! ```
//!
//! The check is one atomic load. Only a call that sees an expired window takes
//! the site's lock and re-checks, so among concurrent callers exactly one
//! fires per window.
//!
//! ## Features
//!
//! - **Per-site state in a `static`**: every primitive has a `const`
//!   constructor, and the macros declare one static per expansion
//! - **Integer rate math**: calls per second with three decimals, no floats
//! - **Region profiling**: call rate, usage, average and peak duration
//! - **Dumps**: `name=value` and hex buffers tagged with the call site
//! - **Runtime sites**: a bounded concurrent registry keyed by label or location
//! - **Pluggable output**: stderr, stdout, in-memory buffer, `tracing`, or your own sink
//! - **Deterministic tests**: inject a [`ManualClock`] anywhere a clock is read
//!
//! ## Quick Start
//!
//! ### Macros
//!
//! ```rust
//! use qprint::{qp_print_loc, qp_print_ratelimit, qp_print_once};
//!
//! for i in 0..10_000 {
//!     qp_print_once!("starting");
//!     qp_print_ratelimit!("processed item {}", i);
//! }
//! qp_print_loc!("done");
//! ```
//!
//! ### Explicit State
//!
//! ```rust
//! use qprint::{RateCounter, RateLimiter};
//!
//! static RETRY: RateLimiter = RateLimiter::with_interval(5_000);
//! static DROPS: RateCounter = RateCounter::new();
//!
//! if RETRY.fire() > 0 {
//!     // at most once every five seconds
//! }
//! if let Some(report) = DROPS.record() {
//!     println!("{}: packet dropped", report);
//! }
//! ```
//!
//! ### Custom Printer
//!
//! ```rust
//! use qprint::{BufferSink, PrinterBuilder, TimeHeader};
//!
//! let sink = BufferSink::new();
//! let printer = PrinterBuilder::new()
//!     .time_header(TimeHeader::Millis)
//!     .interval_ms(250)
//!     .sink(sink.clone())
//!     .build();
//!
//! printer.print_loc(format_args!("hello"));
//! assert!(sink.contents().starts_with('['));
//! ```
//!
//! ## Configuration
//!
//! The global printer used by the macros reads these variables once:
//!
//! | Variable                | Values                | Default |
//! |-------------------------|-----------------------|---------|
//! | `QP_RATELIMIT_INTERVAL` | milliseconds          | `1000`  |
//! | `QP_TIME_HEADER`        | `none`, `4_3`, `5_6`  | `none`  |
//! | `QP_NL`                 | `0` disables newline  | `1`     |
//!
//! Install a different printer with [`set_global`] before the first macro
//! runs.
//!
//! ## Known Limitations
//!
//! Timestamps are unsigned and compared with wrapping subtraction. A clock
//! that moves backwards causes one spurious fire.
//!
//! ## Demos
//!
//! See the `demos/` directory:
//! - `basic.rs` - Macros, limiters, counters and profiling
//! - `site_registry.rs` - Runtime-keyed sites shared across threads

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

mod dump;
mod error;
mod printer;
mod ratelimit;
mod sink;

#[macro_use]
mod macros;

// Public re-exports
pub use dump::HexBytes;
pub use error::{ConfigError, QpError, Result};
pub use printer::{global, set_global, Printer};
pub use ratelimit::{
    current_time_ms, current_time_ns, current_time_us, div_rem, Clock, HistogramCounter,
    ManualClock, MemoryOrdering, MonotonicClock, OnceFlag, PrinterConfig, ProfileReport, Profiler,
    Rate, RateCounter, RateLimiter, RateReport, RegionTimer, RegistryStats, SiteConfig, SiteKey,
    SiteMetrics, SiteRegistry, TimeHeader, DEFAULT_INTERVAL_MS, DEFAULT_MAX_SITES, ENV_INTERVAL,
    ENV_NEWLINE, ENV_TIME_HEADER, MAX_INTERVAL_MS,
};
pub use sink::{BufferSink, NullSink, Sink, StderrSink, StdoutSink, TracingSink};

/// A site registry wrapped in `Arc` for sharing across threads.
pub type SharedRegistry = std::sync::Arc<SiteRegistry>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum supported Rust version.
pub const MSRV: &str = "1.70.0";

/// Prelude module for convenient imports.
///
/// ```rust
/// use qprint::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for typical use.
    //!
    //! # Example
    //! ```rust
    //! use qprint::prelude::*;
    //!
    //! static SITE: RateCounter = RateCounter::new();
    //! let printer = PrinterBuilder::new().sink(NullSink).build();
    //! printer.print_ratelimited(&SITE, format_args!("tick"));
    //! ```

    pub use crate::{
        qp_dump_hex, qp_dump_var, qp_once, qp_print, qp_print_hist_ratelimit, qp_print_loc,
        qp_print_loc_once, qp_print_once, qp_print_ratelimit, qp_profile, qp_ratelimit, qp_trace,
        qp_trace_ratelimit,
    };
    pub use crate::{
        BufferSink, NullSink, OnceFlag, Printer, PrinterBuilder, PrinterConfig, Profiler,
        RateCounter, RateLimiter, SharedRegistry, SiteConfig, SiteKey, SiteRegistry, TimeHeader,
    };
}

/// Builder for [`Printer`]s with non-default settings.
///
/// ```rust
/// use qprint::{PrinterBuilder, StdoutSink, TimeHeader};
///
/// let printer = PrinterBuilder::new()
///     .time_header(TimeHeader::Micros)
///     .newline(true)
///     .interval_ms(500)
///     .sink(StdoutSink)
///     .build();
///
/// // Or use try_build() for error handling
/// let result = PrinterBuilder::new()
///     .interval_ms(u64::MAX)  // Invalid!
///     .try_build();
///
/// assert!(result.is_err());
/// ```
pub struct PrinterBuilder {
    config: PrinterConfig,
    sink: std::sync::Arc<dyn Sink>,
    clock: std::sync::Arc<dyn Clock>,
}

impl PrinterBuilder {
    /// Creates a builder with default configuration.
    ///
    /// Defaults:
    /// - 1000ms interval
    /// - no time header
    /// - trailing newline
    /// - standard error
    pub fn new() -> Self {
        Self::with_config(PrinterConfig::default())
    }

    /// Starts from an existing configuration, for example
    /// [`PrinterConfig::from_env`].
    pub fn with_config(config: PrinterConfig) -> Self {
        Self {
            config,
            sink: std::sync::Arc::new(StderrSink),
            clock: std::sync::Arc::new(MonotonicClock),
        }
    }

    /// Sets the timestamp prefix.
    pub fn time_header(mut self, header: TimeHeader) -> Self {
        self.config.time_header = header;
        self
    }

    /// Enables or disables the trailing newline.
    pub fn newline(mut self, newline: bool) -> Self {
        self.config.newline = newline;
        self
    }

    /// Sets the interval used by rate-limited prints.
    pub fn interval_ms(mut self, ms: u64) -> Self {
        self.config.interval_ms = ms;
        self
    }

    /// Sets the output sink.
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = std::sync::Arc::new(sink);
        self
    }

    /// Sets the clock used for time headers.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = std::sync::Arc::new(clock);
        self
    }

    /// Builds the printer.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. Use `try_build()` to handle
    /// the error instead.
    pub fn build(self) -> Printer {
        match self.try_build() {
            Ok(printer) => printer,
            Err(err) => panic!("invalid printer configuration: {}", err),
        }
    }

    /// Attempts to build the printer, returning an error if invalid.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval exceeds [`MAX_INTERVAL_MS`].
    pub fn try_build(self) -> std::result::Result<Printer, ConfigError> {
        self.config.validate()?;
        Ok(Printer::from_parts(self.config, self.sink, self.clock))
    }
}

impl Default for PrinterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrinterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrinterBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
