//! # Site Registry
//!
//! Macros give every call site its own `static` counter. Code that cannot name
//! a static, for example a site chosen at runtime or a plugin loaded later,
//! keeps its counters in a [`SiteRegistry`] instead.
//!
//! ## Architecture
//!
//! ```text
//!     Sites:
//!     "db.retry" ──────────┐
//!     "net.drop" ──────────┤
//!     src/io.rs:42:9 ──────┼──► SiteRegistry ──► RateCounter per site
//!     src/io.rs:97:13 ─────┘         │
//!                                    ▼
//!                           ┌────────────────┐
//!                           │    DashMap     │
//!                           │  key → Arc<RC> │
//!                           │  key → Arc<RC> │
//!                           └────────────────┘
//! ```
//!
//! The map is sharded, so lookups of existing sites from many threads do not
//! contend. The number of sites is bounded; a registry at capacity refuses new
//! sites instead of growing without limit.

use std::borrow::Cow;
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::{
    clock::current_time_ms,
    config::SiteConfig,
    counter::{RateCounter, RateReport},
    metrics::SiteMetrics,
};
use crate::error::ConfigError;

/// Default bound on the number of tracked sites.
pub const DEFAULT_MAX_SITES: usize = 10_000;

/// Identity of a call site.
///
/// ```rust
/// use qprint::SiteKey;
///
/// let by_name = SiteKey::from("db.retry");
/// let here = SiteKey::caller();
/// assert_ne!(by_name, here);
/// assert!(here.to_string().contains(".rs:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SiteKey {
    /// A caller-chosen name.
    Label(Cow<'static, str>),
    /// A source location.
    Location {
        /// Source file.
        file: &'static str,
        /// Line number.
        line: u32,
        /// Column number.
        column: u32,
    },
}

impl SiteKey {
    /// Key for the location that called this function.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&'static str> for SiteKey {
    fn from(label: &'static str) -> Self {
        Self::Label(Cow::Borrowed(label))
    }
}

impl From<String> for SiteKey {
    fn from(label: String) -> Self {
        Self::Label(Cow::Owned(label))
    }
}

impl From<&'static Location<'static>> for SiteKey {
    fn from(location: &'static Location<'static>) -> Self {
        Self::Location {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{}", label),
            Self::Location { file, line, column } => write!(f, "{}:{}:{}", file, line, column),
        }
    }
}

/// Concurrent map from [`SiteKey`] to shared [`RateCounter`]s.
///
/// ```rust
/// use qprint::{SiteConfig, SiteRegistry};
///
/// let registry = SiteRegistry::new(SiteConfig::per_second());
///
/// assert!(registry.record("cache.miss").is_some());
/// assert!(registry.record("cache.miss").is_none());
/// assert_eq!(registry.len(), 1);
///
/// let counter = registry.counter("cache.miss").unwrap();
/// assert_eq!(counter.call_count(), 2);
/// ```
pub struct SiteRegistry {
    sites: DashMap<SiteKey, Arc<RateCounter>, ahash::RandomState>,

    /// Reserved slots, kept separately for cheap capacity checks.
    active_count: AtomicUsize,

    max_sites: usize,

    config: SiteConfig,

    total_created: AtomicU64,
    total_removed: AtomicU64,
}

impl SiteRegistry {
    /// Creates a registry holding up to [`DEFAULT_MAX_SITES`] sites.
    pub fn new(config: SiteConfig) -> Self {
        let num_shards = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .next_power_of_two()
            .clamp(2, 64);

        Self {
            sites: DashMap::with_capacity_and_hasher_and_shard_amount(
                64,
                ahash::RandomState::new(),
                num_shards,
            ),
            active_count: AtomicUsize::new(0),
            max_sites: DEFAULT_MAX_SITES,
            config,
            total_created: AtomicU64::new(0),
            total_removed: AtomicU64::new(0),
        }
    }

    /// Creates a registry holding up to `max_sites` sites.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_sites` is 0.
    pub fn with_capacity(config: SiteConfig, max_sites: usize) -> Result<Self, ConfigError> {
        if max_sites == 0 {
            return Err(ConfigError::ZeroCapacity("max_sites"));
        }
        let mut registry = Self::new(config);
        registry.max_sites = max_sites;
        Ok(registry)
    }

    /// Returns the counter for `key`, creating it on first use.
    ///
    /// Returns `None` when the site is new and the registry is full.
    pub fn counter(&self, key: impl Into<SiteKey>) -> Option<Arc<RateCounter>> {
        let key = key.into();
        if let Some(counter) = self.sites.get(&key) {
            return Some(counter.clone());
        }

        if self.active_count.load(Ordering::Acquire) >= self.max_sites {
            warn!(site = %key, max_sites = self.max_sites, "site registry full, rejecting site");
            return None;
        }

        match self.sites.entry(key) {
            Entry::Occupied(occupied) => Some(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let prev = self.active_count.fetch_add(1, Ordering::AcqRel);
                if prev >= self.max_sites {
                    self.active_count.fetch_sub(1, Ordering::AcqRel);
                    warn!(site = %vacant.key(), "site registry capacity race, rejecting site");
                    return None;
                }

                let counter = Arc::new(RateCounter::with_config(self.config.clone()));
                debug!(site = %vacant.key(), total = prev + 1, "registered site");
                vacant.insert(counter.clone());
                self.total_created.fetch_add(1, Ordering::Relaxed);
                Some(counter)
            }
        }
    }

    /// Counts one call at `key` and reports the rate if the site fires.
    ///
    /// A site rejected for capacity never fires.
    #[inline]
    pub fn record(&self, key: impl Into<SiteKey>) -> Option<RateReport> {
        self.counter(key)?.record()
    }

    /// Whether `key` is tracked.
    pub fn contains(&self, key: &SiteKey) -> bool {
        self.sites.contains_key(key)
    }

    /// Activity snapshot of `key`, if tracked.
    pub fn metrics(&self, key: &SiteKey) -> Option<SiteMetrics> {
        self.sites.get(key).map(|counter| counter.metrics())
    }

    /// Stops tracking `key`. Holders of its `Arc` keep a working counter.
    pub fn remove(&self, key: &SiteKey) -> Option<Arc<RateCounter>> {
        let (_, counter) = self.sites.remove(key)?;
        self.active_count.fetch_sub(1, Ordering::AcqRel);
        self.total_removed.fetch_add(1, Ordering::Relaxed);
        debug!(site = %key, "removed site");
        Some(counter)
    }

    /// Removes sites that have not been called during the last `idle_ms`.
    ///
    /// A site whose window is still open is kept whatever `idle_ms` says;
    /// recreating it would let it fire again inside that window.
    ///
    /// Returns the number of sites removed.
    pub fn prune_idle(&self, idle_ms: u64) -> usize {
        let now = current_time_ms();
        let mut removed = 0;

        self.sites.retain(|key, counter| {
            let limiter = counter.limiter();
            let last_active = counter.last_call_ms().max(limiter.last_fire_ms());
            if now.saturating_sub(last_active) <= idle_ms.max(limiter.interval_ms()) {
                true
            } else {
                debug!(site = %key, "pruning idle site");
                removed += 1;
                self.active_count.fetch_sub(1, Ordering::AcqRel);
                false
            }
        });

        if removed > 0 {
            self.total_removed.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "pruned idle sites");
        }
        removed
    }

    /// Removes every site.
    pub fn clear(&self) {
        let mut count = 0usize;
        self.sites.retain(|_, _| {
            count += 1;
            false
        });
        self.active_count.fetch_sub(count, Ordering::AcqRel);
        self.total_removed.fetch_add(count as u64, Ordering::Relaxed);
        info!(count, "cleared site registry");
    }

    /// Number of tracked sites.
    #[inline]
    pub fn len(&self) -> usize {
        self.active_count.load(Ordering::Acquire)
    }

    /// Whether no site is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bound on the number of sites.
    pub fn max_sites(&self) -> usize {
        self.max_sites
    }

    /// Registry-wide statistics.
    pub fn stats(&self) -> RegistryStats {
        let active_sites = self.len();
        RegistryStats {
            active_sites,
            total_created: self.total_created.load(Ordering::Relaxed),
            total_removed: self.total_removed.load(Ordering::Relaxed),
            capacity_used: active_sites as f64 / self.max_sites as f64,
            max_sites: self.max_sites,
        }
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new(SiteConfig::default())
    }
}

impl fmt::Debug for SiteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteRegistry")
            .field("active_sites", &self.len())
            .field("max_sites", &self.max_sites)
            .field("interval_ms", &self.config.interval_ms)
            .finish()
    }
}

/// Statistics for a [`SiteRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryStats {
    /// Sites currently tracked.
    pub active_sites: usize,

    /// Sites created since the registry was built.
    pub total_created: u64,

    /// Sites removed, pruned or cleared since the registry was built.
    pub total_removed: u64,

    /// Fraction of capacity in use (0.0 to 1.0).
    pub capacity_used: f64,

    /// Bound on the number of sites.
    pub max_sites: usize,
}

impl RegistryStats {
    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Site Registry Stats:\n\
             ├─ Capacity:\n\
             │  ├─ Active Sites: {}/{}\n\
             │  ├─ Capacity Used: {:.2}%\n\
             │  └─ Available Slots: {}\n\
             └─ Lifetime:\n\
                ├─ Total Created: {}\n\
                └─ Total Removed: {}",
            self.active_sites,
            self.max_sites,
            self.capacity_used * 100.0,
            self.max_sites.saturating_sub(self.active_sites),
            self.total_created,
            self.total_removed,
        )
    }

    /// Whether more than 80% of capacity is in use.
    pub fn is_near_capacity(&self) -> bool {
        self.capacity_used > 0.8
    }
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryOrdering;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_sites_are_independent() {
        let registry = SiteRegistry::default();
        assert!(registry.record("a").is_some());
        assert!(registry.record("b").is_some());
        assert!(registry.record("a").is_none());
        assert_eq!(registry.len(), 2);

        let metrics = registry.metrics(&SiteKey::from("a")).unwrap();
        assert_eq!(metrics.total_calls, 2);
        assert_eq!(metrics.total_fires, 1);
    }

    #[test]
    fn test_location_keys() {
        let registry = SiteRegistry::default();
        let mut keys = Vec::new();
        for _ in 0..3 {
            keys.push(SiteKey::caller());
        }
        // Same textual site every iteration.
        assert!(keys.windows(2).all(|w| w[0] == w[1]));

        let other = SiteKey::caller();
        assert_ne!(keys[0], other);

        registry.record(keys[0].clone());
        registry.record(other.clone());
        assert!(registry.contains(&keys[0]));
        assert!(registry.contains(&other));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_owned_and_borrowed_labels_match() {
        let registry = SiteRegistry::default();
        registry.record("dyn.site");
        assert!(registry.record(String::from("dyn.site")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_capacity_limit() {
        let registry = SiteRegistry::with_capacity(SiteConfig::default(), 3).unwrap();
        for i in 0..3 {
            assert!(registry.counter(format!("site-{}", i)).is_some());
        }
        assert!(registry.counter("overflow").is_none());
        assert!(registry.record("overflow").is_none());

        // Existing sites stay reachable at capacity.
        assert!(registry.counter("site-0").is_some());

        let stats = registry.stats();
        assert_eq!(stats.active_sites, 3);
        assert_eq!(stats.total_created, 3);
        assert!(stats.is_near_capacity());

        assert!(matches!(
            SiteRegistry::with_capacity(SiteConfig::default(), 0),
            Err(ConfigError::ZeroCapacity("max_sites"))
        ));
    }

    #[test]
    fn test_concurrent_creation() {
        let registry = Arc::new(SiteRegistry::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    (0..100)
                        .filter(|_| registry.record("shared").is_some())
                        .count()
                })
            })
            .collect();

        let fires: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(fires, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.stats().total_created, 1);
        assert_eq!(registry.counter("shared").unwrap().call_count(), 800);
    }

    #[test]
    fn test_concurrent_capacity() {
        let registry = Arc::new(SiteRegistry::with_capacity(SiteConfig::default(), 50).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        registry.counter(format!("t{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 50);
        assert_eq!(registry.stats().total_created, 50);
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = SiteRegistry::default();
        let key = SiteKey::from("gone");
        let counter = registry.counter(key.clone()).unwrap();
        counter.record();

        let removed = registry.remove(&key).unwrap();
        assert_eq!(removed.call_count(), 1);
        assert!(registry.remove(&key).is_none());
        assert!(registry.is_empty());

        // A removed site starts over.
        assert!(registry.record(key.clone()).is_some());

        registry.record("x");
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.stats().total_removed, 3);
    }

    #[test]
    fn test_prune_idle() {
        let registry = SiteRegistry::default();
        registry.record("fired");
        // Registered but never fired: last fire is the epoch.
        registry.counter("silent");

        assert_eq!(registry.prune_idle(60_000), 1);
        assert!(registry.contains(&SiteKey::from("fired")));
        assert!(!registry.contains(&SiteKey::from("silent")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_prune_keeps_open_window() {
        let registry = SiteRegistry::new(SiteConfig::per_minute());
        assert!(registry.record("hot").is_some());
        thread::sleep(Duration::from_millis(20));
        assert!(registry.record("hot").is_none());

        assert_eq!(registry.prune_idle(5), 0);
        assert!(registry.record("hot").is_none());
        assert_eq!(registry.counter("hot").unwrap().call_count(), 3);
    }

    #[test]
    fn test_prune_after_window_closes() {
        let registry = SiteRegistry::new(SiteConfig::new(1));
        registry.record("quiet");
        registry.record("busy");
        thread::sleep(Duration::from_millis(100));
        registry.record("busy");

        assert_eq!(registry.prune_idle(50), 1);
        assert!(registry.contains(&SiteKey::from("busy")));
        assert!(!registry.contains(&SiteKey::from("quiet")));
    }

    #[test]
    fn test_clear_while_inserting() {
        let registry = Arc::new(SiteRegistry::default());
        let writer = {
            let registry = registry.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    registry.counter(format!("w-{}", i));
                }
            })
        };
        for _ in 0..20 {
            registry.clear();
        }
        writer.join().unwrap();

        let remaining = registry.sites.len();
        assert_eq!(registry.len(), remaining);
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.sites.len(), 0);
    }

    #[test]
    fn test_sites_use_registry_config() {
        let config = SiteConfig::new(250).with_ordering(MemoryOrdering::Sequential);
        let registry = SiteRegistry::new(config);
        let counter = registry.counter("cfg").unwrap();
        assert_eq!(counter.limiter().interval_ms(), 250);
        assert_eq!(counter.limiter().memory_ordering(), MemoryOrdering::Sequential);
    }

    #[test]
    fn test_stats_summary() {
        let registry = SiteRegistry::with_capacity(SiteConfig::default(), 4).unwrap();
        registry.counter("one");
        let stats = registry.stats();
        let summary = stats.summary();
        assert!(summary.contains("Active Sites: 1/4"));
        assert!(summary.contains("Capacity Used: 25.00%"));
        assert!(summary.contains("Available Slots: 3"));
        assert_eq!(format!("{}", stats), summary);
    }

    #[test]
    fn test_site_key_display() {
        assert_eq!(SiteKey::from("net.drop").to_string(), "net.drop");
        let key = SiteKey::Location {
            file: "src/io.rs",
            line: 42,
            column: 9,
        };
        assert_eq!(key.to_string(), "src/io.rs:42:9");
    }
}
