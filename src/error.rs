//! Error types for the pincache library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: the single error surface of the crate. Every failure is
//!   synchronous and carries a category-style message:
//!   - `InvalidHandle`: an empty handle was dereferenced (caller error).
//!   - `InvalidEntry`: a pinned slot was never populated (implementation
//!     bug; should not occur in correct code).
//!   - `AmbiguousProbe`: more than one stored key supports a probe value
//!     (client-side key-design error).
//!
//! The cache itself never retries, never logs, and never panics on its own;
//! reclamation operations cannot fail.
//!
//! ## Example Usage
//!
//! ```
//! use pincache::cache::ConcurrentCache;
//! use pincache::error::CacheError;
//!
//! let cache: ConcurrentCache<String, i32> = ConcurrentCache::new();
//! let handle = cache.at(&"absent".to_string());
//! assert_eq!(handle.get(), Err(CacheError::InvalidHandle));
//! ```

use std::fmt;

/// Error returned by cache and handle operations.
///
/// All variants indicate misuse rather than recoverable conditions: an empty
/// handle was read, a never-populated slot was read, or a probe value was
/// supported by more than one stored key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// An empty handle was dereferenced.
    InvalidHandle,
    /// A pinned slot was never populated with a value.
    InvalidEntry {
        /// Sequence number of the offending entry.
        sequence_number: u64,
    },
    /// More than one stored key supports the probed value.
    AmbiguousProbe {
        /// How many keys claimed support.
        matches: usize,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidHandle => {
                write!(
                    f,
                    "invalid cache handle dereference: handle does not refer to any cache entry"
                )
            },
            CacheError::InvalidEntry { sequence_number } => {
                write!(
                    f,
                    "invalid cache entry dereference: cache entry {} is empty",
                    sequence_number
                )
            },
            CacheError::AmbiguousProbe { matches } => {
                write!(
                    f,
                    "ambiguous probe: {} stored keys support the probed value, expected at most one",
                    matches
                )
            },
        }
    }
}

impl std::error::Error for CacheError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
