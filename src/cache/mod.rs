//! Cache Module
//!
//! Cache-aside layer in front of the relational store: typed get/set,
//! pattern invalidation, counters, and the read-through `get_or_set`.
//! Keys and lifetimes come from the shared [`CacheKeys`] / [`CacheTtl`] policy.

pub mod keys;
mod payload;
mod service;
mod stats;


// Re-export public types
pub use keys::{CacheKeys, CacheTtl, PageSlice, Role};
pub use payload::{PayloadError, CACHE_SCHEMA_VERSION};
pub use service::{CacheService, Lookup};
pub use stats::{CacheStats, StatsRecorder};
