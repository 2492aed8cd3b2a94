//! Probe-lookup trait for user-defined key types.
//!
//! A set of cached data frequently applies to a *range* of values rather
//! than a single one. Instead of inserting one cache element per value, the
//! key type can describe the range it covers and answer whether a given
//! probe value falls inside it. Key types implementing [`Supports`] unlock
//! [`ConcurrentCache::entry_for`](crate::cache::ConcurrentCache::entry_for),
//! which retrieves the element whose key supports a probed value.
//!
//! For each probe value, at most one stored key may claim support. Two keys
//! supporting the same value is a runtime error
//! ([`AmbiguousProbe`](crate::error::CacheError::AmbiguousProbe)), not a
//! tie to be broken.
//!
//! ## Example Usage
//!
//! ```
//! use pincache::cache::ConcurrentCache;
//! use pincache::traits::Supports;
//!
//! /// Half-open range of run numbers, `[begin, end)`.
//! #[derive(Clone, Copy, PartialEq, Eq, Hash)]
//! struct RunRange {
//!     begin: u32,
//!     end: u32,
//! }
//!
//! impl Supports<u32> for RunRange {
//!     fn supports(&self, run: &u32) -> bool {
//!         self.begin <= *run && *run < self.end
//!     }
//! }
//!
//! let cache: ConcurrentCache<RunRange, &str> = ConcurrentCache::new();
//! cache.emplace(RunRange { begin: 0, end: 10 }, "early runs");
//!
//! let handle = cache.entry_for(&6).unwrap();
//! assert_eq!(handle.get().copied(), Ok("early runs"));
//! assert!(!cache.entry_for(&10).unwrap().is_valid());
//! ```

/// Predicate connecting a key to the probe values it covers.
///
/// `P` is the probe type offered to
/// [`entry_for`](crate::cache::ConcurrentCache::entry_for). A key may
/// support probes of several types by implementing the trait once per type.
pub trait Supports<P> {
    /// Returns `true` if `probe` falls within this key's semantic range.
    fn supports(&self, probe: &P) -> bool;
}
