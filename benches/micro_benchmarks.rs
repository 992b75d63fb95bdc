//! # Micro Benchmarks
//!
//! Fine-grained benchmarks for the building blocks under the sites.
//!
//! Run with: `cargo bench --bench micro_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qprint::{
    current_time_ms, current_time_ns, current_time_us, div_rem, Clock, ManualClock,
    MonotonicClock, OnceFlag, PrinterConfig, Rate, RateLimiter, SiteMetrics, TimeHeader,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Benchmark the fast-path atomic load against taking the site lock
fn bench_check_vs_lock(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_vs_lock");

    let orderings = [("Relaxed", Ordering::Relaxed), ("Acquire", Ordering::Acquire)];
    for (name, ordering) in &orderings {
        group.bench_function(format!("load_{}", name), |b| {
            let atomic = AtomicU64::new(42);
            b.iter(|| black_box(atomic.load(*ordering)));
        });
    }

    group.bench_function("mutex_lock_unlock", |b| {
        let lock = Mutex::new(());
        b.iter(|| {
            let guard = lock.lock().unwrap();
            black_box(&guard);
        });
    });

    group.finish();
}

/// Benchmark time functions
fn bench_time_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_functions");

    group.bench_function("current_time_ms", |b| {
        b.iter(|| black_box(current_time_ms()));
    });

    group.bench_function("current_time_us", |b| {
        b.iter(|| black_box(current_time_us()));
    });

    group.bench_function("current_time_ns", |b| {
        b.iter(|| black_box(current_time_ns()));
    });

    group.bench_function("monotonic_clock", |b| {
        let clock = MonotonicClock;
        b.iter(|| black_box(clock.now_ms()));
    });

    group.bench_function("manual_clock", |b| {
        let clock = ManualClock::new(1_000);
        b.iter(|| black_box(clock.now_ms()));
    });

    group.bench_function("std_instant_now", |b| {
        b.iter(|| black_box(std::time::Instant::now()));
    });

    group.finish();
}

/// Benchmark fixed-point rate arithmetic
fn bench_rate_math(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_math");

    for (calls, elapsed_ms) in [(1u64, 1000u64), (1000, 1000), (123_456, 1_001), (5, 0)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_over_{}ms", calls, elapsed_ms)),
            &(calls, elapsed_ms),
            |b, &(calls, elapsed_ms)| {
                b.iter(|| black_box(Rate::from_window(black_box(calls), black_box(elapsed_ms))));
            },
        );
    }

    group.bench_function("div_rem", |b| {
        b.iter(|| black_box(div_rem(black_box(1_000_000_007), black_box(1000))));
    });

    group.bench_function("rate_to_string", |b| {
        let rate = Rate::from_window(12_345, 1_000);
        b.iter(|| black_box(rate.to_string()));
    });

    group.bench_function("rate_as_f64", |b| {
        let rate = Rate::from_window(12_345, 1_000);
        b.iter(|| black_box(rate.as_f64()));
    });

    group.finish();
}

/// Benchmark once-flag checks after the first call
fn bench_once_flag(c: &mut Criterion) {
    let mut group = c.benchmark_group("once_flag");

    group.bench_function("first_after_set", |b| {
        let flag = OnceFlag::new();
        flag.first();
        b.iter(|| black_box(flag.first()));
    });

    group.bench_function("is_set", |b| {
        let flag = OnceFlag::new();
        b.iter(|| black_box(flag.is_set()));
    });

    group.finish();
}

/// Benchmark metrics snapshot and summary
fn bench_metrics_calculation(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics_calculation");

    group.bench_function("snapshot", |b| {
        let limiter = RateLimiter::with_interval(60_000);
        for _ in 0..100 {
            limiter.fire();
        }
        b.iter(|| black_box(limiter.metrics()));
    });

    let metrics = SiteMetrics {
        total_calls: 1_000_000,
        total_fires: 60,
        total_suppressed: 999_940,
        last_fire_ms: 1,
        interval_ms: 1000,
    };

    group.bench_function("fire_ratio", |b| {
        b.iter(|| black_box(metrics.fire_ratio()));
    });

    group.bench_function("summary", |b| {
        b.iter(|| black_box(metrics.summary()));
    });

    group.finish();
}

/// Benchmark configuration parsing
fn bench_config(c: &mut Criterion) {
    let mut group = c.benchmark_group("config");

    for raw in ["none", "4_3", "5_6"] {
        group.bench_function(format!("parse_header_{}", raw), |b| {
            b.iter(|| black_box(black_box(raw).parse::<TimeHeader>()));
        });
    }

    group.bench_function("validate", |b| {
        let config = PrinterConfig::default();
        b.iter(|| black_box(config.validate()));
    });

    group.finish();
}

criterion_group!(
    micro_benches,
    bench_check_vs_lock,
    bench_time_functions,
    bench_rate_math,
    bench_once_flag,
    bench_metrics_calculation,
    bench_config,
);

criterion_main!(micro_benches);
