//! Reference-counted cache cell types.
//!
//! `EntryCount` carries the identity of an entry (its sequence number) and
//! its pin count; it is shared as `Arc<EntryCount>` between the primary map
//! entry and the cache's auxiliary metadata map so reclamation can observe
//! pin counts without locking primary-map shards. `CacheEntry` is the stored
//! cell itself: an immutable `Arc`-owned value plus its counter.
//!
//! Not user-facing; handles are the only way values leave the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::CacheError;

/// Identity and pin count of one cache entry.
///
/// Sequence numbers start at 0 and increment by one for each entry created
/// over the lifetime of a cache; they are never reused, which is what makes
/// "retain the n most recently created" reclamation possible.
#[derive(Debug)]
pub(crate) struct EntryCount {
    sequence_number: u64,
    use_count: AtomicU32,
}

impl EntryCount {
    pub(crate) fn new(sequence_number: u64) -> Self {
        Self {
            sequence_number,
            use_count: AtomicU32::new(0),
        }
    }

    /// Placeholder counter for a slot that has not been populated yet.
    fn invalid() -> Self {
        Self {
            sequence_number: u64::MAX,
            use_count: AtomicU32::new(u32::MAX),
        }
    }

    pub(crate) fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Current pin count. Acquire: pairs with the Release decrement so a
    /// handle release happens-before a reclamation scan observing zero.
    pub(crate) fn use_count(&self) -> u32 {
        self.use_count.load(Ordering::Acquire)
    }

    pub(crate) fn increment(&self) {
        self.use_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decrement(&self) {
        self.use_count.fetch_sub(1, Ordering::Release);
    }
}

/// The stored cell: an immutable value and its shared counter.
///
/// `Default` produces the unpopulated placeholder a fresh primary-map slot
/// holds between creation and assignment; reading it yields `InvalidEntry`.
/// Cloning shares the value and counter, it does not touch the pin count.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
    value: Option<Arc<V>>,
    count: Arc<EntryCount>,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            value: None,
            count: Arc::new(EntryCount::invalid()),
        }
    }
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            count: Arc::clone(&self.count),
        }
    }
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, count: Arc<EntryCount>) -> Self {
        Self {
            value: Some(Arc::new(value)),
            count,
        }
    }

    pub(crate) fn get(&self) -> Result<&Arc<V>, CacheError> {
        self.value.as_ref().ok_or(CacheError::InvalidEntry {
            sequence_number: self.count.sequence_number(),
        })
    }

    pub(crate) fn count(&self) -> &Arc<EntryCount> {
        &self.count
    }

    pub(crate) fn use_count(&self) -> u32 {
        self.count.use_count()
    }

    pub(crate) fn sequence_number(&self) -> u64 {
        self.count.sequence_number()
    }
}
