pub use crate::builder::CacheBuilder;
pub use crate::cache::ConcurrentCache;
pub use crate::error::CacheError;
pub use crate::handle::CacheHandle;
pub use crate::metrics::CacheMetrics;
pub use crate::traits::Supports;
