//! Property Cache - caching and rate limiting for the property management API
//!
//! Cache-aside reads over a Redis (or in-process) key-value store with
//! pattern invalidation, fixed-window rate limiting per user and action,
//! and the hooks that drop stale views after writes.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod rate_limit;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheKeys, CacheService, CacheTtl, Lookup, Role};
pub use config::Config;
pub use invalidation::{InvalidationTarget, Invalidator, Mutation};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use store::{KvStore, MemoryStore, RedisStore, StoreBackend};
pub use tasks::spawn_cleanup_task;
