//! pincache: a concurrent, reference-counted associative cache with
//! cooperative reclamation.
//!
//! The cache stores immutable values shared across worker threads through
//! pinning [`CacheHandle`](handle::CacheHandle)s: an entry cannot be removed
//! while any handle refers to it. Memory is reclaimed cooperatively: at
//! safe points callers run [`drop_unused`](cache::ConcurrentCache::drop_unused)
//! or [`drop_unused_but_last`](cache::ConcurrentCache::drop_unused_but_last),
//! which remove unpinned entries while optionally retaining the n most
//! recently created ones. There is no bounded capacity and no eviction
//! policy.
//!
//! Key types exposing a [`Supports`](traits::Supports) predicate unlock
//! lookup by probe value
//! ([`entry_for`](cache::ConcurrentCache::entry_for)): a key covering a
//! range of values (say, an interval of validity) is found from any value
//! it covers, so one cached element serves the whole range.
//!
//! ```
//! use pincache::cache::ConcurrentCache;
//!
//! let ages: ConcurrentCache<String, u32> = ConcurrentCache::new();
//!
//! let handle = ages.emplace("Alice".to_string(), 97);
//! assert_eq!(handle.get(), Ok(&97));
//!
//! // A second emplace on the same key is a read: first writer wins.
//! let again = ages.emplace("Alice".to_string(), 0);
//! assert_eq!(again.get(), Ok(&97));
//!
//! drop(handle);
//! drop(again);
//! ages.drop_unused();
//! assert!(ages.is_empty());
//! ```

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod prelude;
pub mod traits;

mod entry;
