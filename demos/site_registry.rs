//! Runtime-keyed sites shared across threads.

use qprint::{SiteConfig, SiteKey, SiteRegistry};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    tracing_subscriber::fmt().with_env_filter("qprint=debug").init();

    let registry = Arc::new(SiteRegistry::new(SiteConfig::new(200)));

    // Workers report errors by a name chosen at runtime.
    let handles: Vec<_> = ["disk", "net", "db"]
        .into_iter()
        .map(|kind| {
            let registry = registry.clone();
            thread::spawn(move || {
                let start = Instant::now();
                while start.elapsed() < Duration::from_millis(700) {
                    if let Some(report) = registry.record(format!("error.{}", kind)) {
                        println!("[{}] {}: simulated failure", kind, report);
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Location keys for sites that have no natural name.
    for _ in 0..5 {
        if let Some(report) = registry.record(SiteKey::caller()) {
            println!("{}: loop site", report);
        }
    }

    println!();
    if let Some(metrics) = registry.metrics(&SiteKey::from("error.net")) {
        println!("{}", metrics.summary());
    }

    println!();
    println!("{}", registry.stats().summary());
}
