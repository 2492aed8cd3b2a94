//! Operation counters for the cache.
//!
//! Cumulative atomic counters updated on the hot paths with `Relaxed`
//! ordering and read through a point-in-time [`CacheMetrics`] snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of cache-level metrics.
///
/// All fields are cumulative since cache creation.
///
/// # Example
///
/// ```
/// use pincache::metrics::CacheMetrics;
///
/// let metrics = CacheMetrics {
///     hits: 150,
///     misses: 50,
///     inserts: 40,
///     reuses: 110,
///     drops: 30,
/// };
///
/// let hit_rate = metrics.hits as f64 / (metrics.hits + metrics.misses) as f64;
/// assert!((hit_rate - 0.75).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries created by `emplace`.
    pub inserts: u64,
    /// `emplace` calls that returned a pre-existing entry.
    pub reuses: u64,
    /// Entries erased by reclamation.
    pub drops: u64,
}

/// Atomic counter cells backing [`CacheMetrics`].
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    reuses: AtomicU64,
    drops: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn snapshot(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_reuse(&self) {
        self.reuses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_drops(&self, dropped: u64) {
        self.drops.fetch_add(dropped, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() {
        let counters = CacheCounters::default();
        assert_eq!(counters.snapshot(), CacheMetrics::default());

        counters.inc_hit();
        counters.inc_miss();
        counters.inc_miss();
        counters.inc_insert();
        counters.inc_reuse();
        counters.add_drops(3);

        let metrics = counters.snapshot();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 2);
        assert_eq!(metrics.inserts, 1);
        assert_eq!(metrics.reuses, 1);
        assert_eq!(metrics.drops, 3);
    }
}
