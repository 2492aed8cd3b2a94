//! Sharded concurrent map with per-shard exclusive slot access.
//!
//! The locking primitive underneath [`ConcurrentCache`](crate::cache::ConcurrentCache):
//! a plain `HashMap` per shard, each behind its own `parking_lot::Mutex`,
//! with an atomic entry counter for lock-free (approximate) sizing.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                       ShardedMap<K, T, S>                         │
//! │                                                                   │
//! │   key ──► hasher.hash_one(key) % shards ──► shard index           │
//! │                                                                   │
//! │   ┌─────────────────┬─────────────────┬─────────────────┐         │
//! │   │ Mutex<HashMap>  │ Mutex<HashMap>  │ Mutex<HashMap>  │  ...    │
//! │   │    shard 0      │    shard 1      │    shard 2      │         │
//! │   └─────────────────┴─────────────────┴─────────────────┘         │
//! │                                                                   │
//! │   acquire(key) ─► Slot guard: shard locked, entry pinned,         │
//! │                   created from T::default() if absent             │
//! │   find(key)    ─► Slot guard over an existing entry, or None      │
//! │   remove_if    ─► re-check a predicate under the shard lock,      │
//! │                   then erase                                      │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Concepts
//!
//! - **Slot pinning**: while a [`Slot`] guard is alive, no other thread can
//!   read, write, or erase any key in that shard. Release is scope-bound.
//! - **Guarded erase**: `remove_if` evaluates its predicate with the shard
//!   lock held, closing the window between observing an entry and erasing
//!   it.
//! - **Approximate size**: `len` reads an atomic counter without touching
//!   any shard lock; under concurrent mutation the value may be stale by
//!   the time it is used.
//!
//! The map does not order insertions and has no capacity bound.

use std::collections::HashMap;
use std::collections::hash_map::{Entry, RandomState};
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

/// Default shard count: one shard per available hardware thread.
pub(crate) fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

/// Concurrent map distributing keys over independently locked shards.
#[derive(Debug)]
pub struct ShardedMap<K, T, S = RandomState> {
    shards: Vec<Mutex<HashMap<K, T, S>>>,
    size: AtomicUsize,
    hasher: S,
}

impl<K, T> ShardedMap<K, T, RandomState>
where
    K: Eq + Hash,
{
    /// Create a map with `shards` shards and the default hasher.
    ///
    /// The shard count is clamped to at least 1.
    pub fn new(shards: usize) -> Self {
        Self::with_hasher(shards, RandomState::new())
    }
}

impl<K, T, S> ShardedMap<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Create a map with `shards` shards and a custom hasher.
    ///
    /// The hasher both selects shards and hashes within each shard. The
    /// shard count is clamped to at least 1.
    pub fn with_hasher(shards: usize, hasher: S) -> Self {
        let shard_count = shards.max(1);
        let mut shard_vec = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shard_vec.push(Mutex::new(HashMap::with_hasher(hasher.clone())));
        }
        Self {
            shards: shard_vec,
            size: AtomicUsize::new(0),
            hasher,
        }
    }
}

impl<K, T, S> ShardedMap<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Return the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Return the number of entries. Approximate under concurrent mutation.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) as usize) % self.shards.len()
    }

    /// Lock the key's shard and pin its slot, creating the slot from
    /// `T::default()` if the key was absent.
    ///
    /// [`Slot::inserted`] reports whether the slot is fresh. The shard stays
    /// locked until the returned guard is dropped, so populating a fresh
    /// slot and handing out references to it cannot interleave with other
    /// threads operating on the same key.
    pub fn acquire(&self, key: K) -> Slot<'_, K, T, S>
    where
        K: Clone,
        T: Default,
    {
        let idx = self.shard_index(&key);
        let mut shard = self.shards[idx].lock();
        let inserted = match shard.entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(T::default());
                self.size.fetch_add(1, Ordering::Relaxed);
                true
            },
        };
        Slot {
            shard,
            size: &self.size,
            key,
            inserted,
        }
    }

    /// Lock the key's shard and pin its slot if the key is present.
    pub fn find(&self, key: &K) -> Option<Slot<'_, K, T, S>>
    where
        K: Clone,
    {
        let idx = self.shard_index(key);
        let shard = self.shards[idx].lock();
        if !shard.contains_key(key) {
            return None;
        }
        Some(Slot {
            shard,
            size: &self.size,
            key: key.clone(),
            inserted: false,
        })
    }

    /// Remove the key's entry only if `pred` holds for it, evaluated under
    /// the shard lock.
    ///
    /// Returns the removed value, or `None` if the key was absent or the
    /// predicate rejected it. An entry observed outside the lock may change
    /// before removal; the predicate is the authoritative re-check.
    pub fn remove_if<F>(&self, key: &K, pred: F) -> Option<T>
    where
        F: FnOnce(&T) -> bool,
    {
        let idx = self.shard_index(key);
        let mut shard = self.shards[idx].lock();
        if !shard.get(key).is_some_and(pred) {
            return None;
        }
        let removed = shard.remove(key);
        if removed.is_some() {
            self.size.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Visit every `(key, value)` pair, shard by shard.
    ///
    /// Only one shard is locked at a time, so the traversal interleaves
    /// with concurrent inserts and removals on other shards; it is not a
    /// consistent snapshot.
    pub fn scan<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &T),
    {
        for shard in &self.shards {
            let guard = shard.lock();
            for (key, value) in guard.iter() {
                visit(key, value);
            }
        }
    }
}

/// Exclusive guard over one map entry.
///
/// Holds the shard's mutex for its whole lifetime. The pinned entry can be
/// read, written, or erased; everything else in the shard is inaccessible
/// to other threads until the guard drops.
pub struct Slot<'a, K, T, S = RandomState> {
    shard: MutexGuard<'a, HashMap<K, T, S>>,
    size: &'a AtomicUsize,
    key: K,
    inserted: bool,
}

impl<K, T, S> Slot<'_, K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Returns `true` if `acquire` created this slot rather than finding it.
    pub fn inserted(&self) -> bool {
        self.inserted
    }

    /// The key this slot is pinned to.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Shared access to the pinned entry.
    pub fn get(&self) -> &T {
        self.shard
            .get(&self.key)
            .expect("slot entry exists while the guard is held")
    }

    /// Exclusive access to the pinned entry.
    pub fn get_mut(&mut self) -> &mut T {
        self.shard
            .get_mut(&self.key)
            .expect("slot entry exists while the guard is held")
    }

    /// Erase the pinned entry and release the shard lock.
    pub fn erase(mut self) -> T {
        let removed = self
            .shard
            .remove(&self.key)
            .expect("slot entry exists while the guard is held");
        self.size.fetch_sub(1, Ordering::Relaxed);
        removed
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_then_pins() {
        let map: ShardedMap<&str, i32> = ShardedMap::new(4);

        let mut slot = map.acquire("alpha");
        assert!(slot.inserted());
        *slot.get_mut() = 7;
        drop(slot);

        let slot = map.acquire("alpha");
        assert!(!slot.inserted());
        assert_eq!(*slot.get(), 7);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn find_pins_existing_only() {
        let map: ShardedMap<&str, i32> = ShardedMap::new(4);
        assert!(map.find(&"absent").is_none());

        let mut slot = map.acquire("present");
        *slot.get_mut() = 1;
        drop(slot);

        let slot = map.find(&"present").unwrap();
        assert_eq!(*slot.get(), 1);
        assert_eq!(slot.key(), &"present");
    }

    #[test]
    fn erase_through_slot_updates_size() {
        let map: ShardedMap<&str, i32> = ShardedMap::new(2);
        let mut slot = map.acquire("doomed");
        *slot.get_mut() = 9;
        drop(slot);
        assert_eq!(map.len(), 1);

        let slot = map.find(&"doomed").unwrap();
        assert_eq!(slot.erase(), 9);
        assert!(map.is_empty());
        assert!(map.find(&"doomed").is_none());
    }

    #[test]
    fn remove_if_respects_predicate() {
        let map: ShardedMap<&str, i32> = ShardedMap::new(2);
        let mut slot = map.acquire("pinned");
        *slot.get_mut() = 3;
        drop(slot);

        assert_eq!(map.remove_if(&"pinned", |v| *v == 0), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove_if(&"pinned", |v| *v == 3), Some(3));
        assert!(map.is_empty());
        assert_eq!(map.remove_if(&"pinned", |_| true), None);
    }

    #[test]
    fn scan_visits_every_entry() {
        let map: ShardedMap<u64, u64> = ShardedMap::new(4);
        for k in 0..32u64 {
            *map.acquire(k).get_mut() = k * 2;
        }

        let mut seen = Vec::new();
        map.scan(|k, v| seen.push((*k, *v)));
        seen.sort_unstable();
        let expected: Vec<_> = (0..32u64).map(|k| (k, k * 2)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn zero_shards_clamps_to_one() {
        let map: ShardedMap<u64, u64> = ShardedMap::new(0);
        assert_eq!(map.shard_count(), 1);
        *map.acquire(1).get_mut() = 1;
        assert_eq!(map.len(), 1);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, u16),
        Remove(u8),
        RemoveIfEven(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
            any::<u8>().prop_map(Op::Remove),
            any::<u8>().prop_map(Op::RemoveIfEven),
        ]
    }

    proptest! {
        /// Property: any sequence of operations leaves the sharded map in
        /// agreement with a plain HashMap model.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_matches_hashmap_model(
            shards in 1usize..8,
            ops in prop::collection::vec(op_strategy(), 0..64)
        ) {
            let map: ShardedMap<u8, u16> = ShardedMap::new(shards);
            let mut model: HashMap<u8, u16> = HashMap::new();

            for op in ops {
                match op {
                    Op::Insert(k, v) => {
                        *map.acquire(k).get_mut() = v;
                        model.insert(k, v);
                    },
                    Op::Remove(k) => {
                        let removed = map.find(&k).map(|slot| slot.erase());
                        prop_assert_eq!(removed, model.remove(&k));
                    },
                    Op::RemoveIfEven(k) => {
                        let removed = map.remove_if(&k, |v| v % 2 == 0);
                        let expected = match model.get(&k) {
                            Some(v) if v % 2 == 0 => model.remove(&k),
                            _ => None,
                        };
                        prop_assert_eq!(removed, expected);
                    },
                }
            }

            prop_assert_eq!(map.len(), model.len());
            let mut seen = Vec::new();
            map.scan(|k, v| seen.push((*k, *v)));
            seen.sort_unstable();
            let mut expected: Vec<_> = model.into_iter().collect();
            expected.sort_unstable();
            prop_assert_eq!(seen, expected);
        }
    }
}
