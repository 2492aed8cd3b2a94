//! Concurrent reference-counted cache with cooperative reclamation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                      ConcurrentCache<K, V, S>                        │
//! │                                                                      │
//! │   ┌────────────────────────────────────────────────────────────┐     │
//! │   │  entries: ShardedMap<K, CacheEntry<V>>   (primary map)     │     │
//! │   │                                                            │     │
//! │   │  key ─► shard lock ─► CacheEntry { Arc<V>, Arc<count> }    │     │
//! │   └──────────────────────────────┬─────────────────────────────┘     │
//! │                                  │ counter shared per entry          │
//! │   ┌──────────────────────────────▼─────────────────────────────┐     │
//! │   │  counts: RwLock<FxHashMap<K, Arc<EntryCount>>>  (metadata) │     │
//! │   │                                                            │     │
//! │   │  scanned by entry_for and reclamation without touching     │     │
//! │   │  primary-map shard locks                                   │     │
//! │   └────────────────────────────────────────────────────────────┘     │
//! │                                                                      │
//! │   next_sequence_number: AtomicU64   (strict creation order, from 0)  │
//! └──────────────────────────────────────────────────────────────────────┘
//!
//! Entry lifecycle
//! ───────────────
//!
//!   empty slot ──emplace──► live (pins = k, k changes ±1 per handle)
//!                               │
//!                     last pin released
//!                               ▼
//!                        reclaimable (pins = 0) ──at/entry_for──► live
//!                               │
//!                  drop_unused* observes 0, re-checks
//!                  under the slot lock, erases
//!                               ▼
//!                            erased
//! ```
//!
//! ## Key Concepts
//!
//! - **Pinning**: an entry with a live [`CacheHandle`] is never removed.
//!   Reclamation only erases entries whose pin count is observed at zero
//!   and re-confirmed under the slot lock.
//! - **First writer wins**: `emplace` on an existing key discards the new
//!   value and returns the cached one. Duplicate emplace is a read.
//! - **Insertion order**: each entry gets a unique sequence number at
//!   birth, so `drop_unused_but_last(n)` can retain the n most recently
//!   created unpinned entries.
//! - **No bounded capacity**: memory is reclaimed only by the `drop_unused*`
//!   family and `shrink_to_fit`; there is no eviction policy.
//!
//! ## Concurrency
//!
//! Every operation except [`shrink_to_fit`](ConcurrentCache::shrink_to_fit)
//! may be called concurrently. Blocking is limited to per-shard locks of
//! the primary map and the metadata `RwLock`; `emplace` linearises per key,
//! so exactly one caller inserts and the rest observe that entry. Metadata
//! scans are not snapshots: keys may appear during a scan, and a key
//! reclaimed mid-scan surfaces as an empty handle.
//!
//! A shard lock may be held while the metadata write lock is taken (the
//! emplace path); no path holds a metadata guard while taking a shard
//! lock, because scans collect keys into a `Vec` and release the guard
//! first.
//!
//! ## Example Usage
//!
//! ```
//! use pincache::cache::ConcurrentCache;
//!
//! let cache: ConcurrentCache<String, i32> = ConcurrentCache::new();
//!
//! let handle = cache.emplace("Alice".to_string(), 97);
//! assert_eq!(handle.get(), Ok(&97));
//! assert_eq!(cache.len(), 1);
//!
//! drop(handle);
//! cache.drop_unused();
//! assert!(cache.is_empty());
//! ```

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ds::{ShardedMap, default_shard_count};
use crate::entry::{CacheEntry, EntryCount};
use crate::error::CacheError;
use crate::handle::CacheHandle;
use crate::metrics::{CacheCounters, CacheMetrics};
use crate::traits::Supports;

/// Concurrent, reference-counted, insertion-ordered associative cache.
///
/// Values are immutable once inserted and are shared across threads through
/// pinning [`CacheHandle`]s. Unpinned entries are removed cooperatively by
/// [`drop_unused`](Self::drop_unused) and
/// [`drop_unused_but_last`](Self::drop_unused_but_last).
#[derive(Debug)]
pub struct ConcurrentCache<K, V, S = RandomState> {
    entries: ShardedMap<K, CacheEntry<V>, S>,
    counts: RwLock<FxHashMap<K, Arc<EntryCount>>>,
    next_sequence_number: AtomicU64,
    metrics: CacheCounters,
}

impl<K, V> ConcurrentCache<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache with one primary-map shard per available hardware
    /// thread and the default hasher.
    pub fn new() -> Self {
        Self::with_shards(default_shard_count())
    }

    /// Create a cache with a fixed primary-map shard count.
    ///
    /// The shard count is clamped to at least 1.
    pub fn with_shards(shards: usize) -> Self {
        Self::with_hasher(shards, RandomState::new())
    }
}

impl<K, V> Default for ConcurrentCache<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ConcurrentCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    /// Create a cache with a fixed shard count and a custom hasher for the
    /// primary map.
    pub fn with_hasher(shards: usize, hasher: S) -> Self {
        Self {
            entries: ShardedMap::with_hasher(shards, hasher),
            counts: RwLock::new(FxHashMap::default()),
            next_sequence_number: AtomicU64::new(0),
            metrics: CacheCounters::default(),
        }
    }

    /// Insert `value` under `key`, or pin the entry already stored there.
    ///
    /// First writer wins: if the key is present the supplied `value` is
    /// discarded and the returned handle pins the cached entry. Otherwise
    /// the entry is created with the next sequence number and its handle is
    /// constructed before the slot lock is released, so the fresh entry is
    /// pinned before any other thread can observe it.
    pub fn emplace(&self, key: K, value: V) -> CacheHandle<V> {
        // Slot lock held on the key until the function returns.
        let mut slot = self.entries.acquire(key);
        if !slot.inserted() {
            self.metrics.inc_reuse();
            return CacheHandle::from_entry(slot.get());
        }

        let sequence_number = self.next_sequence_number.fetch_add(1, Ordering::Relaxed);
        let count = Arc::new(EntryCount::new(sequence_number));
        *slot.get_mut() = CacheEntry::new(value, Arc::clone(&count));

        // Insert-or-overwrite: a key re-emplaced after reclamation replaces
        // its stale metadata entry.
        self.counts.write().insert(slot.key().clone(), count);
        self.metrics.inc_insert();
        CacheHandle::from_entry(slot.get())
    }

    /// Pin the entry stored under `key`, or return an empty handle.
    ///
    /// Never creates entries.
    pub fn at(&self, key: &K) -> CacheHandle<V> {
        match self.entries.find(key) {
            Some(slot) => {
                self.metrics.inc_hit();
                CacheHandle::from_entry(slot.get())
            },
            None => {
                self.metrics.inc_miss();
                CacheHandle::default()
            },
        }
    }

    /// Pin the entry whose key supports `probe`.
    ///
    /// Scans the stored keys and delegates to [`at`](Self::at) for the
    /// unique supporting key. No supporting key yields an empty handle; so
    /// does a key reclaimed between the scan and the lookup. The scan
    /// interleaves with concurrent inserts and is not a snapshot.
    ///
    /// # Errors
    ///
    /// [`CacheError::AmbiguousProbe`] if more than one stored key supports
    /// `probe`; at most one may, by the key type's contract.
    pub fn entry_for<P>(&self, probe: &P) -> Result<CacheHandle<V>, CacheError>
    where
        K: Supports<P>,
    {
        let matching_keys: Vec<K> = {
            let counts = self.counts.read();
            counts
                .keys()
                .filter(|key| key.supports(probe))
                .cloned()
                .collect()
        };

        match matching_keys.len() {
            0 => {
                self.metrics.inc_miss();
                Ok(CacheHandle::default())
            },
            1 => Ok(self.at(&matching_keys[0])),
            matches => Err(CacheError::AmbiguousProbe { matches }),
        }
    }

    /// Remove every entry whose pin count is zero.
    ///
    /// Equivalent to `drop_unused_but_last(0)`.
    pub fn drop_unused(&self) {
        self.drop_unused_but_last(0);
    }

    /// Remove unpinned entries, retaining the `keep_last` most recently
    /// created ones.
    ///
    /// Entries pinned at scan time are always retained. Among entries
    /// observed unpinned, the `keep_last` with the highest sequence numbers
    /// survive. An entry re-pinned (or re-created under the same key)
    /// between the scan and the erase is left alone: the erase re-checks,
    /// under the slot lock, that the entry is still unpinned and still the
    /// one the scan observed.
    pub fn drop_unused_but_last(&self, keep_last: usize) {
        let mut unused = self.unused_entries();
        if unused.len() <= keep_last {
            return;
        }
        unused.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut dropped = 0u64;
        for (sequence_number, key) in unused.drain(keep_last..) {
            let removed = self.entries.remove_if(&key, |entry| {
                entry.use_count() == 0 && entry.sequence_number() == sequence_number
            });
            if removed.is_some() {
                dropped += 1;
            }
        }
        self.metrics.add_drops(dropped);
    }

    /// Drop unused entries and compact the metadata map.
    ///
    /// The metadata map only grows during concurrent operation; this
    /// rebuild releases the memory it retained. Taking `&mut self` makes
    /// the single-threaded-access requirement a compile-time fact. A cache
    /// shared through an `Arc` can reach this via `Arc::get_mut` once all
    /// other owners are gone.
    pub fn shrink_to_fit(&mut self) {
        self.drop_unused();
        let counts = self.counts.get_mut();
        counts.retain(|_, count| count.use_count() > 0);
        counts.shrink_to_fit();
    }

    /// Number of live entries in the primary map. Approximate under
    /// concurrent mutation.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the primary map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the metadata map, which may exceed [`len`](Self::len) after
    /// reclamation until [`shrink_to_fit`](Self::shrink_to_fit) compacts
    /// it.
    pub fn capacity(&self) -> usize {
        self.counts.read().len()
    }

    /// Number of primary-map shards.
    pub fn shard_count(&self) -> usize {
        self.entries.shard_count()
    }

    /// Snapshot of the cache's operation counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.snapshot()
    }

    /// Collect `(sequence_number, key)` for every entry whose pin count is
    /// observed at zero. The metadata guard is released before the caller
    /// touches any shard lock.
    fn unused_entries(&self) -> Vec<(u64, K)> {
        let counts = self.counts.read();
        counts
            .iter()
            .filter(|(_, count)| count.use_count() == 0)
            .map(|(key, count)| (count.sequence_number(), key.clone()))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: after drop_unused_but_last(n), every pinned entry
        /// survives and exactly the n most recently created unpinned
        /// entries survive.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_retention_law(
            total in 1usize..24,
            pinned_mask in any::<u32>(),
            keep_last in 0usize..8
        ) {
            let cache: ConcurrentCache<u32, u32> = ConcurrentCache::with_shards(4);

            let mut pinned = Vec::new();
            let mut unpinned_keys = Vec::new();
            for k in 0..total as u32 {
                let handle = cache.emplace(k, k);
                if pinned_mask & (1 << (k % 32)) != 0 {
                    pinned.push((k, handle));
                } else {
                    unpinned_keys.push(k);
                }
            }

            cache.drop_unused_but_last(keep_last);

            for (key, handle) in &pinned {
                prop_assert!(cache.at(key).is_valid());
                prop_assert_eq!(handle.get().copied(), Ok(*key));
            }

            // Keys were emplaced in increasing order, so sequence order is
            // key order: the retained unpinned entries are the last n.
            let retained = unpinned_keys.len().min(keep_last);
            let cutoff = unpinned_keys.len() - retained;
            for key in &unpinned_keys[..cutoff] {
                prop_assert!(!cache.at(key).is_valid());
            }
            for key in &unpinned_keys[cutoff..] {
                prop_assert!(cache.at(key).is_valid());
            }

            prop_assert_eq!(cache.len(), pinned.len() + retained);
        }

        /// Property: re-emplacing any key is a read of the first value.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_first_writer_wins(
            keys in prop::collection::vec(any::<u8>(), 1..64)
        ) {
            let cache: ConcurrentCache<u8, (u8, usize)> = ConcurrentCache::with_shards(2);
            let mut first_write: std::collections::HashMap<u8, usize> =
                std::collections::HashMap::new();

            for (order, key) in keys.iter().enumerate() {
                let handle = cache.emplace(*key, (*key, order));
                let expected = *first_write.entry(*key).or_insert(order);
                prop_assert_eq!(handle.get(), Ok(&(*key, expected)));
            }

            prop_assert_eq!(cache.len(), first_write.len());
        }
    }
}
