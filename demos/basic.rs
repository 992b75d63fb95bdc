//! Basic usage example for the qprint crate.

use core::time::Duration;
use qprint::{
    qp_dump_hex, qp_dump_var, qp_print_loc, qp_print_once, qp_print_ratelimit, qp_profile,
    qp_trace, set_global, PrinterBuilder, Profiler, RateCounter, RateLimiter, StdoutSink, TimeHeader,
};
use std::thread;
use std::time::Instant;

fn main() {
    // Route the macros to stdout with a millisecond header.
    let printer = PrinterBuilder::new()
        .time_header(TimeHeader::Millis)
        .interval_ms(250)
        .sink(StdoutSink)
        .build();
    if set_global(printer).is_err() {
        eprintln!("global printer was already installed");
    }

    println!("=== Basic qprint Example ===\n");

    // Example 1: Macros
    macro_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 2: Explicit limiter
    limiter_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 3: Rate reports
    counter_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 4: Profiling
    profile_example();
}

fn macro_example() {
    println!("1. Call-Site Macros:");

    qp_trace!();

    for i in 0..3 {
        qp_print_once!("printed once, i={}", i);
    }

    // A tight loop for about a second: one line per 250ms window.
    let start = Instant::now();
    let mut calls = 0u64;
    while start.elapsed() < Duration::from_millis(1100) {
        qp_print_ratelimit!("spinning, calls so far={}", calls);
        calls += 1;
    }
    qp_print_loc!("loop made {} calls", calls);
    qp_dump_var!(calls);

    let header = [0x45u8, 0x00, 0x00, 0x54, 0x1c, 0x46, 0x40, 0x00, 0x40, 0x01, 0xb1, 0xe6];
    qp_dump_hex!(header);
}

fn limiter_example() {
    println!("2. Explicit Limiter:");

    static SITE: RateLimiter = RateLimiter::with_interval(100);

    for i in 1..=10 {
        let elapsed = SITE.fire();
        if elapsed > 0 {
            println!("   Call {} - ✅ fired ({}ms since previous)", i, elapsed);
        } else {
            println!("   Call {} - ⏸  suppressed, {}ms left", i, SITE.remaining_ms());
        }
        thread::sleep(Duration::from_millis(30));
    }

    println!("\n{}", SITE.metrics().summary());
}

fn counter_example() {
    println!("3. Rate Reports:");

    let counter = RateCounter::with_interval(200);
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(650) {
        if let Some(report) = counter.record() {
            println!(
                "   {} (window of {} calls over {}ms)",
                report, report.window_count, report.elapsed_ms
            );
        }
        thread::sleep(Duration::from_micros(500));
    }

    println!("   Total calls: {}", counter.call_count());
}

fn profile_example() {
    println!("4. Region Profiling:");

    // Through the macro: one report per global interval.
    for i in 0..400u64 {
        let _ = qp_profile!({ (0..i * 100).sum::<u64>() }, "summing");
    }

    // Explicit profiler with a visible report.
    let profiler = Profiler::with_interval(100);
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(350) {
        let (_, report) = profiler.time(|| thread::sleep(Duration::from_millis(5)));
        if let Some(report) = report {
            println!("   {}", report);
        }
    }
}
