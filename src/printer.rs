//! # Printer
//!
//! Formats diagnostic lines and hands them to a [`Sink`].
//!
//! ```text
//!     print_loc("x={}", x)
//!          │
//!          ▼
//!     ┌──────────────┐   ┌──────────────────┐   ┌──────────┐   ┌──────┐
//!     │ time header  │──►│ file(line):      │──►│ message  │──►│ "\n" │──► Sink
//!     │ [ssss.mmm]   │   │ caller location  │   │          │   │      │
//!     └──────────────┘   └──────────────────┘   └──────────┘   └──────┘
//! ```
//!
//! Every printing method is `#[track_caller]`, so the location in the header
//! is the line that called the printer (or expanded a `qp_*` macro), not a
//! line inside this crate.
//!
//! ## Global printer
//!
//! The macros print through [`global()`]. It is built lazily from the `QP_*`
//! environment variables on first use unless [`set_global`] installed another
//! printer before that.

use std::fmt::{self, Write as _};
use std::panic::Location;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::dump::hex_dump;

use crate::error::{ConfigError, QpError};
use crate::ratelimit::{
    Clock, MonotonicClock, OnceFlag, PrinterConfig, ProfileReport, RateCounter, TimeHeader,
};
use crate::sink::{Sink, StderrSink};

static GLOBAL: OnceLock<Printer> = OnceLock::new();

/// Formats and writes diagnostic lines.
///
/// ```rust
/// use qprint::{BufferSink, Printer, PrinterConfig};
///
/// let sink = BufferSink::new();
/// let printer = Printer::with_sink(PrinterConfig::default(), sink.clone());
///
/// printer.print_loc(format_args!("answer={}", 42));
/// assert!(sink.contents().ends_with("): answer=42\n"));
/// ```
pub struct Printer {
    config: PrinterConfig,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
}

impl Printer {
    /// Creates a printer writing to standard error.
    pub fn new(config: PrinterConfig) -> Self {
        Self::with_sink(config, StderrSink)
    }

    /// Creates a printer writing to `sink`.
    pub fn with_sink(config: PrinterConfig, sink: impl Sink + 'static) -> Self {
        Self::from_parts(config, Arc::new(sink), Arc::new(MonotonicClock))
    }

    pub(crate) fn from_parts(
        config: PrinterConfig,
        sink: Arc<dyn Sink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sink,
            clock,
        }
    }

    /// Creates a stderr printer configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a `QP_*` variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(PrinterConfig::from_env()?))
    }

    /// The printer's configuration.
    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Interval applied by [`print_ratelimited`](Self::print_ratelimited)
    /// and by the rate-limiting macros.
    #[inline]
    pub fn interval_ms(&self) -> u64 {
        self.config.interval_ms
    }

    /// Writes `args` without a header.
    pub fn print(&self, args: fmt::Arguments<'_>) {
        self.emit(None, args);
    }

    /// Writes `args` behind a time and location header.
    #[track_caller]
    pub fn print_loc(&self, args: fmt::Arguments<'_>) {
        self.emit(Some(Location::caller()), args);
    }

    /// Writes the caller's location and nothing else.
    #[track_caller]
    pub fn trace(&self) {
        self.print_loc(format_args!("trace"));
    }

    /// Writes `args` without a header the first time `flag` is seen.
    /// Returns whether it wrote.
    pub fn print_once(&self, flag: &OnceFlag, args: fmt::Arguments<'_>) -> bool {
        if !flag.first() {
            return false;
        }
        self.print(args);
        true
    }

    /// [`print_once`](Self::print_once) behind a time and location header.
    #[track_caller]
    pub fn print_loc_once(&self, flag: &OnceFlag, args: fmt::Arguments<'_>) -> bool {
        if !flag.first() {
            return false;
        }
        self.print_loc(args);
        true
    }

    /// Counts a call at `counter` and, when the site fires, writes `args`
    /// prefixed with the cumulative count and the call rate. Returns whether
    /// it wrote.
    ///
    /// ```text
    /// main.rs(40): cnt=1100 rate=1000.000/s: queue full
    /// ```
    #[track_caller]
    pub fn print_ratelimited<C: Clock>(
        &self,
        counter: &RateCounter<C>,
        args: fmt::Arguments<'_>,
    ) -> bool {
        match counter.should_fire_and_report(self.interval_ms()) {
            Some(report) => {
                self.print_loc(format_args!("{}: {}", report, args));
                true
            }
            None => false,
        }
    }

    /// [`print_ratelimited`](Self::print_ratelimited) through the counter
    /// selected by `bucket`.
    ///
    /// A bucket outside `buckets` writes nothing and is logged.
    #[track_caller]
    pub fn print_hist_ratelimited<C: Clock>(
        &self,
        buckets: &[RateCounter<C>],
        bucket: usize,
        args: fmt::Arguments<'_>,
    ) -> bool {
        match buckets.get(bucket) {
            Some(counter) => self.print_ratelimited(counter, args),
            None => {
                let location = Location::caller();
                warn!(
                    bucket,
                    len = buckets.len(),
                    file = location.file(),
                    line = location.line(),
                    "histogram bucket out of range"
                );
                false
            }
        }
    }

    /// Writes `name=value` using the value's `Debug` form.
    ///
    /// ```rust
    /// use qprint::{BufferSink, Printer, PrinterConfig};
    ///
    /// let sink = BufferSink::new();
    /// let printer = Printer::with_sink(PrinterConfig::default(), sink.clone());
    ///
    /// let retries = 3;
    /// printer.dump_var("retries", &retries);
    /// assert!(sink.contents().ends_with("): retries=3\n"));
    /// ```
    #[track_caller]
    pub fn dump_var(&self, name: &str, value: &dyn fmt::Debug) {
        self.print_loc(format_args!("{}={:?}", name, value));
    }

    /// Writes a summary line with the caller's header, then `bytes` as hex,
    /// sixteen per row in groups of eight.
    #[track_caller]
    pub fn dump_hex(&self, bytes: &[u8]) {
        self.print_loc(format_args!("{}", hex_dump(bytes)));
    }

    /// Writes a profiling report followed by `args`.
    #[track_caller]
    pub fn print_profile(&self, report: &ProfileReport, args: fmt::Arguments<'_>) {
        self.print_loc(format_args!("{} {}", report, args));
    }

    /// Header for a line written at `location` right now.
    pub fn header(&self, location: &Location<'_>) -> String {
        let mut line = String::new();
        self.write_header(&mut line, location);
        line
    }

    fn write_header(&self, line: &mut String, location: &Location<'_>) {
        let _ = match self.config.time_header {
            TimeHeader::None => Ok(()),
            TimeHeader::Millis => {
                let ms = self.clock.now_ms();
                write!(line, "[{:04}.{:03}] ", ms / 1000 % 10_000, ms % 1000)
            }
            TimeHeader::Micros => {
                let ns = self.clock.now_ns();
                write!(
                    line,
                    "[{:05}.{:06}] ",
                    ns / 1_000_000_000 % 100_000,
                    ns / 1000 % 1_000_000
                )
            }
        };
        let _ = write!(line, "{}({}): ", location.file(), location.line());
    }

    fn emit(&self, location: Option<&Location<'_>>, args: fmt::Arguments<'_>) {
        let mut line = String::with_capacity(128);
        if let Some(location) = location {
            self.write_header(&mut line, location);
        }
        let _ = line.write_fmt(args);
        if self.config.newline && !line.ends_with('\n') {
            line.push('\n');
        }
        self.sink.write(&line);
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(PrinterConfig::default())
    }
}

impl fmt::Debug for Printer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The process-wide printer used by the macros.
///
/// Built from [`PrinterConfig::from_env`] on first use. An invalid
/// environment is logged and replaced by the defaults.
pub fn global() -> &'static Printer {
    GLOBAL.get_or_init(|| match Printer::from_env() {
        Ok(printer) => {
            debug!(config = ?printer.config(), "initialized global printer");
            printer
        }
        Err(err) => {
            warn!(error = %err, "invalid qprint environment, using defaults");
            Printer::default()
        }
    })
}

/// Installs `printer` as the process-wide printer.
///
/// # Errors
///
/// Returns [`QpError::GlobalAlreadySet`] if a printer was installed already
/// or [`global()`] has been called.
pub fn set_global(printer: Printer) -> Result<(), QpError> {
    GLOBAL.set(printer).map_err(|_| QpError::GlobalAlreadySet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferSink, ManualClock};

    fn printer(config: PrinterConfig, clock: Arc<ManualClock>) -> (BufferSink, Printer) {
        let sink = BufferSink::new();
        let printer = Printer::from_parts(config, Arc::new(sink.clone()), clock);
        (sink, printer)
    }

    #[test]
    fn test_plain_print() {
        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        printer.print(format_args!("x={}", 1));
        printer.print(format_args!("already terminated\n"));
        assert_eq!(sink.contents(), "x=1\nalready terminated\n");
    }

    #[test]
    fn test_location_header() {
        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        let line = line!() + 1;
        printer.print_loc(format_args!("hello"));
        assert_eq!(sink.contents(), format!("{}({}): hello\n", file!(), line));
    }

    #[test]
    fn test_trace() {
        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        printer.trace();
        assert!(sink.contents().ends_with("): trace\n"));
    }

    #[test]
    fn test_millis_header() {
        let clock = Arc::new(ManualClock::new(123_456_789));
        let config = PrinterConfig::default().with_time_header(TimeHeader::Millis);
        let (_sink, printer) = printer(config, clock);

        let header = printer.header(Location::caller());
        assert!(header.starts_with("[3456.789] "));
        assert_eq!(header.find(Location::caller().file()), Some(TimeHeader::Millis.len()));
    }

    #[test]
    fn test_micros_header() {
        let clock = Arc::new(ManualClock::new(0));
        clock.advance_ns(1_234_567_891_234);
        let config = PrinterConfig::default().with_time_header(TimeHeader::Micros);
        let (_sink, printer) = printer(config, clock);

        let header = printer.header(Location::caller());
        assert!(header.starts_with("[01234.567891] "));
        assert_eq!(header.find(Location::caller().file()), Some(TimeHeader::Micros.len()));
    }

    #[test]
    fn test_header_wraps_seconds() {
        let clock = Arc::new(ManualClock::new(10_000_000 + 5));
        let config = PrinterConfig::default().with_time_header(TimeHeader::Millis);
        let (_sink, printer) = printer(config, clock);
        assert!(printer.header(Location::caller()).starts_with("[0000.005] "));
    }

    #[test]
    fn test_newline_disabled() {
        let config = PrinterConfig::default().with_newline(false);
        let (sink, printer) = printer(config, Arc::new(ManualClock::new(0)));
        printer.print(format_args!("a"));
        printer.print(format_args!("b"));
        assert_eq!(sink.contents(), "ab");
    }

    #[test]
    fn test_print_once() {
        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        let flag = OnceFlag::new();
        for i in 0..3 {
            printer.print_once(&flag, format_args!("i={}", i));
        }
        assert_eq!(sink.contents(), "i=0\n");
    }

    #[test]
    fn test_print_loc_once() {
        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        let flag = OnceFlag::new();
        let line = line!() + 2;
        for i in 0..3 {
            printer.print_loc_once(&flag, format_args!("i={}", i));
        }
        assert_eq!(sink.contents(), format!("{}({}): i=0\n", file!(), line));
    }

    #[test]
    fn test_print_hist_ratelimited() {
        let clock = Arc::new(ManualClock::new(50_000));
        let (sink, printer) = printer(PrinterConfig::default(), clock.clone());
        let buckets: Vec<RateCounter<_>> = (0..3)
            .map(|_| RateCounter::with_clock(clock.clone(), 1000))
            .collect();

        assert!(printer.print_hist_ratelimited(&buckets, 1, format_args!("b1")));
        assert!(!printer.print_hist_ratelimited(&buckets, 1, format_args!("b1")));
        assert!(printer.print_hist_ratelimited(&buckets, 2, format_args!("b2")));
        assert!(!printer.print_hist_ratelimited(&buckets, 3, format_args!("b3")));
        assert_eq!(sink.lines().len(), 2);
    }

    #[test]
    fn test_hist_out_of_range_is_logged() {
        let events = BufferSink::new();
        let writer = events.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || SinkWriter(writer.clone()))
            .with_ansi(false)
            .without_time()
            .finish();

        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        let buckets = [RateCounter::new(), RateCounter::new()];
        tracing::subscriber::with_default(subscriber, || {
            assert!(!printer.print_hist_ratelimited(&buckets, 7, format_args!("x")));
        });

        assert!(sink.is_empty());
        let output = events.contents();
        assert!(output.contains("WARN"));
        assert!(output.contains("histogram bucket out of range"));
        assert!(output.contains("bucket=7"));
    }

    #[test]
    fn test_dump_var() {
        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        let flags = 0x1fu16;
        printer.dump_var("flags", &flags);
        printer.dump_var("name", &"eth0");
        printer.dump_var("pair", &(1, true));

        let lines = sink.lines();
        assert!(lines[0].ends_with("): flags=31"));
        assert!(lines[1].ends_with("): name=\"eth0\""));
        assert!(lines[2].ends_with("): pair=(1, true)"));
    }

    #[test]
    fn test_dump_hex() {
        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        let bytes: Vec<u8> = (0..18).collect();
        let line = line!() + 1;
        printer.dump_hex(&bytes);

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            format!("{}({}): DUMP 18 bytes from {:p}:", file!(), line, bytes.as_ptr())
        );
        assert_eq!(
            lines[1],
            "DUMP +0000:  00 01 02 03 04 05 06 07  08 09 0a 0b 0c 0d 0e 0f"
        );
        assert_eq!(lines[2], "DUMP +0010:  10 11");
        assert!(sink.contents().ends_with('\n'));
    }

    #[test]
    fn test_print_ratelimited() {
        let clock = Arc::new(ManualClock::new(50_000));
        let config = PrinterConfig::default().with_interval_ms(100);
        let (sink, printer) = printer(config, clock.clone());
        let counter = RateCounter::with_clock(clock.clone(), 60_000);

        assert!(printer.print_ratelimited(&counter, format_args!("busy")));
        for _ in 0..9 {
            assert!(!printer.print_ratelimited(&counter, format_args!("busy")));
        }
        clock.advance_ms(500);
        assert!(printer.print_ratelimited(&counter, format_args!("busy")));

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("cnt=1 rate=0.020/s: busy"));
        assert!(lines[1].ends_with("cnt=11 rate=20.000/s: busy"));
    }

    #[test]
    fn test_print_profile() {
        let (sink, printer) = printer(PrinterConfig::default(), Arc::new(ManualClock::new(0)));
        let report = ProfileReport {
            total_calls: 2,
            call_rate: 2,
            total_usage_ns: 2_000_000,
            usage_per_sec_us: 2,
            inst_avg_ns: 1_000_000,
            long_avg_ns: 1_000_000,
            inst_max_ns: 1_500_000,
            elapsed_ms: 1000,
        };
        printer.print_profile(&report, format_args!("parse"));
        assert!(sink
            .contents()
            .ends_with("calls=2 2/sec usage=2ms 2us/sec inst_avg_dur=1000000ns \
                        long_avg_dur=1000000ns instmax=1500000ns parse\n"));
    }

    struct SinkWriter(BufferSink);

    impl std::io::Write for SinkWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Sink::write(&self.0, &String::from_utf8_lossy(buf));
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_debug_impl() {
        let printer = Printer::default();
        let debug_str = format!("{:?}", printer);
        assert!(debug_str.contains("Printer"));
        assert!(debug_str.contains("time_header"));
    }
}
