//! RAII pin into a cache entry.
//!
//! A [`CacheHandle`] is how values leave the cache: it gives immutable
//! access to one entry and guarantees the entry cannot be removed for as
//! long as the handle (or any clone of it) is alive. Handles are cheap to
//! clone: two `Arc` pointer copies and one atomic increment.
//!
//! A typical use looks like:
//!
//! ```
//! use pincache::cache::ConcurrentCache;
//!
//! let cache: ConcurrentCache<String, u32> = ConcurrentCache::new();
//! cache.emplace("run-7".to_string(), 1234);
//!
//! let handle = cache.at(&"run-7".to_string());
//! if handle.is_valid() {
//!     let calibration = handle.get().unwrap();
//!     assert_eq!(*calibration, 1234);
//! }
//! ```
//!
//! ## Pinning protocol
//!
//! - Construction from an entry and `Clone` each increment the entry's pin
//!   count exactly once.
//! - `Drop` and [`invalidate`](CacheHandle::invalidate) each decrement
//!   exactly once and empty the handle.
//! - `clone_from` onto a handle already pinning the **same** entry leaves
//!   the count untouched. Decrementing first and re-incrementing would open
//!   a transient zero during which a concurrent reclamation pass could
//!   erase the live entry.
//!
//! Handles never mutate the value they expose.

use std::sync::Arc;

use crate::entry::CacheEntry;
use crate::error::CacheError;

/// Shared, read-only reference to one cache entry.
///
/// A handle is either *valid* (pins exactly one entry) or *empty*. Reading
/// an empty handle yields [`CacheError::InvalidHandle`]; it never dangles.
#[derive(Debug)]
pub struct CacheHandle<V> {
    entry: Option<CacheEntry<V>>,
}

impl<V> CacheHandle<V> {
    /// Pin `entry` and build a handle for it.
    pub(crate) fn from_entry(entry: &CacheEntry<V>) -> Self {
        entry.count().increment();
        Self {
            entry: Some(entry.clone()),
        }
    }

    /// Returns `true` if this handle pins an entry.
    pub fn is_valid(&self) -> bool {
        self.entry.is_some()
    }

    /// Read the pinned value.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidHandle`] if the handle is empty, and
    /// [`CacheError::InvalidEntry`] if the pinned slot was never populated
    /// (an implementation bug, not an expected state).
    pub fn get(&self) -> Result<&V, CacheError> {
        let entry = self.entry.as_ref().ok_or(CacheError::InvalidHandle)?;
        entry.get().map(|value| value.as_ref())
    }

    /// Release the pin early and empty the handle.
    ///
    /// A no-op on an empty handle.
    pub fn invalidate(&mut self) {
        if let Some(entry) = self.entry.take() {
            entry.count().decrement();
        }
    }

    #[cfg(test)]
    pub(crate) fn pinned_use_count(&self) -> Option<u32> {
        self.entry.as_ref().map(CacheEntry::use_count)
    }
}

impl<V> Default for CacheHandle<V> {
    /// An empty handle.
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<V> Clone for CacheHandle<V> {
    fn clone(&self) -> Self {
        match &self.entry {
            Some(entry) => Self::from_entry(entry),
            None => Self::default(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if let (Some(mine), Some(theirs)) = (&self.entry, &source.entry) {
            // Same entry: leave the count alone. See the module notes.
            if Arc::ptr_eq(mine.count(), theirs.count()) {
                return;
            }
        }
        *self = source.clone();
    }
}

impl<V> Drop for CacheHandle<V> {
    fn drop(&mut self) {
        self.invalidate();
    }
}

// =============================================================================
// Tests
// =============================================================================
