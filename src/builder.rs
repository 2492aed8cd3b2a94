//! Cache construction with explicit configuration.
//!
//! The builder covers the two knobs a cache has (primary-map shard count
//! and hasher) and supplies the same defaults as
//! [`ConcurrentCache::new`](crate::cache::ConcurrentCache::new).
//!
//! ## Example
//!
//! ```rust
//! use pincache::builder::CacheBuilder;
//! use pincache::cache::ConcurrentCache;
//!
//! let cache: ConcurrentCache<u64, String> = CacheBuilder::new().shards(8).build();
//! assert_eq!(cache.shard_count(), 8);
//! ```

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

use crate::cache::ConcurrentCache;
use crate::ds::default_shard_count;

/// Builder for [`ConcurrentCache`] instances.
#[derive(Debug, Clone)]
pub struct CacheBuilder<S = RandomState> {
    shards: Option<usize>,
    hasher: S,
}

impl CacheBuilder<RandomState> {
    /// Start from the defaults: one shard per available hardware thread,
    /// `RandomState` hashing.
    pub fn new() -> Self {
        Self {
            shards: None,
            hasher: RandomState::new(),
        }
    }
}

impl Default for CacheBuilder<RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> CacheBuilder<S>
where
    S: BuildHasher + Clone,
{
    /// Set the primary-map shard count. Clamped to at least 1.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards.max(1));
        self
    }

    /// Replace the hasher used for shard selection and in-shard hashing.
    pub fn hasher<S2>(self, hasher: S2) -> CacheBuilder<S2>
    where
        S2: BuildHasher + Clone,
    {
        CacheBuilder {
            shards: self.shards,
            hasher,
        }
    }

    /// Build the cache.
    pub fn build<K, V>(self) -> ConcurrentCache<K, V, S>
    where
        K: Eq + Hash + Clone,
    {
        let shards = self.shards.unwrap_or_else(default_shard_count);
        ConcurrentCache::with_hasher(shards, self.hasher)
    }
}
