//! Call-site macros.
//!
//! Each stateful macro expands to a block declaring its own `static`, so every
//! textual use of the macro owns exactly one state instance for the life of
//! the process. Expanding a macro inside a loop or a function called from many
//! places still yields a single site.
//!
//! All macros print through [`global()`](crate::global).

/// Writes a formatted line without a header.
///
/// ```rust
/// qprint::qp_print!("plain {}", 1);
/// ```
#[macro_export]
macro_rules! qp_print {
    ($($arg:tt)*) => {
        $crate::global().print(::core::format_args!($($arg)*))
    };
}

/// Writes a formatted line behind a time and location header.
///
/// ```rust
/// qprint::qp_print_loc!("x={}", 42);
/// ```
#[macro_export]
macro_rules! qp_print_loc {
    ($($arg:tt)*) => {
        $crate::global().print_loc(::core::format_args!($($arg)*))
    };
}

/// Writes the current location.
#[macro_export]
macro_rules! qp_trace {
    () => {
        $crate::global().trace()
    };
}

/// Evaluates to `true` the first time this site is reached, `false` after.
///
/// ```rust
/// let mut hits = 0;
/// for _ in 0..5 {
///     if qprint::qp_once!() {
///         hits += 1;
///     }
/// }
/// assert_eq!(hits, 1);
/// ```
#[macro_export]
macro_rules! qp_once {
    () => {{
        static FLAG: $crate::OnceFlag = $crate::OnceFlag::new();
        FLAG.first()
    }};
}

/// [`qp_print!`] only the first time this site is reached.
#[macro_export]
macro_rules! qp_print_once {
    ($($arg:tt)*) => {{
        static FLAG: $crate::OnceFlag = $crate::OnceFlag::new();
        $crate::global().print_once(&FLAG, ::core::format_args!($($arg)*))
    }};
}

/// [`qp_print_loc!`] only the first time this site is reached.
#[macro_export]
macro_rules! qp_print_loc_once {
    ($($arg:tt)*) => {{
        static FLAG: $crate::OnceFlag = $crate::OnceFlag::new();
        $crate::global().print_loc_once(&FLAG, ::core::format_args!($($arg)*))
    }};
}

/// Evaluates to the milliseconds since this site last fired, or 0 if it is
/// still inside its window.
///
/// Without an argument the global printer's interval applies.
///
/// ```rust
/// for _ in 0..3 {
///     if qprint::qp_ratelimit!(60_000) > 0 {
///         // runs once per minute at most
///     }
/// }
/// ```
#[macro_export]
macro_rules! qp_ratelimit {
    () => {
        $crate::qp_ratelimit!($crate::global().interval_ms())
    };
    ($interval_ms:expr) => {{
        static SITE: $crate::RateLimiter = $crate::RateLimiter::new();
        SITE.should_fire($interval_ms)
    }};
}

/// Counts calls at this site and, once per interval, writes the message
/// prefixed with `cnt=N rate=R/s: `. Evaluates to whether it wrote.
///
/// ```rust
/// for i in 0..1000 {
///     qprint::qp_print_ratelimit!("dropped packet {}", i);
/// }
/// ```
#[macro_export]
macro_rules! qp_print_ratelimit {
    ($($arg:tt)*) => {{
        static SITE: $crate::RateCounter = $crate::RateCounter::new();
        $crate::global().print_ratelimited(&SITE, ::core::format_args!($($arg)*))
    }};
}

/// Rate-limited [`qp_trace!`].
#[macro_export]
macro_rules! qp_trace_ratelimit {
    () => {
        $crate::qp_print_ratelimit!("trace")
    };
}

/// [`qp_print_ratelimit!`] with an independent counter per bucket.
///
/// `$bucket` selects one of `$len` counters; a bucket outside the range
/// writes nothing and logs a warning.
///
/// ```rust
/// for code in [0usize, 1, 1, 2, 0] {
///     qprint::qp_print_hist_ratelimit!(code, 4, "status {}", code);
/// }
/// ```
#[macro_export]
macro_rules! qp_print_hist_ratelimit {
    ($bucket:expr, $len:expr, $($arg:tt)*) => {{
        const BUCKET: $crate::RateCounter = $crate::RateCounter::new();
        static HIST: [$crate::RateCounter; $len] = [BUCKET; $len];
        $crate::global().print_hist_ratelimited(&HIST, $bucket, ::core::format_args!($($arg)*))
    }};
}

/// Times a block and, once per interval, writes the profiling report for this
/// site followed by the message. Evaluates to the block's value.
///
/// ```rust
/// let total = qprint::qp_profile!({ (1..=10u64).sum::<u64>() }, "sum");
/// assert_eq!(total, 55);
/// ```
#[macro_export]
macro_rules! qp_profile {
    ($body:block, $($arg:tt)*) => {{
        static PROFILE: $crate::Profiler = $crate::Profiler::new();
        let timer = PROFILE.start();
        let out = $body;
        let printer = $crate::global();
        if let ::core::option::Option::Some(report) =
            PROFILE.record_every(timer.elapsed_ns(), printer.interval_ms())
        {
            printer.print_profile(&report, ::core::format_args!($($arg)*));
        }
        out
    }};
}

/// Writes `expr=value` with a location header.
///
/// The value is shown with `Debug` unless a format string is given.
///
/// ```rust
/// let mtu = 1500u32;
/// qprint::qp_dump_var!(mtu);
/// qprint::qp_dump_var!(mtu, "{:#06x}");
/// ```
#[macro_export]
macro_rules! qp_dump_var {
    ($var:expr) => {
        $crate::global().dump_var(::core::stringify!($var), &$var)
    };
    ($var:expr, $fmt:literal) => {
        $crate::global().print_loc(::core::format_args!(
            "{}={}",
            ::core::stringify!($var),
            ::core::format_args!($fmt, $var)
        ))
    };
}

/// Writes a hex dump of anything viewable as bytes, sixteen per row.
///
/// ```rust
/// let frame = [0xdeu8, 0xad, 0xbe, 0xef];
/// qprint::qp_dump_hex!(frame);
/// qprint::qp_dump_hex!(b"payload");
/// ```
#[macro_export]
macro_rules! qp_dump_hex {
    ($buf:expr) => {
        $crate::global().dump_hex(::core::convert::AsRef::<[u8]>::as_ref(&$buf))
    };
}
