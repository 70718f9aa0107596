//! Store Module
//!
//! The key-value store the cache and the rate limiter sit on. [`KvStore`]
//! exposes the handful of wire commands the core needs; [`RedisStore`] talks
//! to a remote server, [`MemoryStore`] keeps everything in-process.

mod entry;
mod memory;
mod pattern;
mod redis_client;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BackendKind, Config};
use crate::error::StoreResult;

// Re-export public types
pub use entry::{current_timestamp_ms, StoredEntry};
pub use memory::MemoryStore;
pub use pattern::KeyPattern;
pub use redis_client::{RedisStore, StoreConfig};

// == Store Trait ==
/// Wire-level operations against a key-value store.
///
/// TTLs are whole seconds. Implementations report failures as
/// [`StoreError`](crate::error::StoreError); containment is the caller's job.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// GET
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// SETEX
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()>;

    /// DEL with any number of keys. Returns how many existed.
    async fn del(&self, keys: &[String]) -> StoreResult<u64>;

    /// KEYS
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// EXISTS
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// SET key value NX EX ttl. Returns whether the value was written.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<bool>;

    /// INCR
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// EXPIRE. Returns false when the key does not exist.
    async fn expire(&self, key: &str, ttl_secs: u64) -> StoreResult<bool>;

    /// INCR, then EXPIRE only if the counter was just created, as one atomic step.
    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> StoreResult<i64>;

    /// PING
    async fn ping(&self) -> StoreResult<()>;
}

// == Backend Selection ==
/// The concrete store the service was started with.
///
/// Handlers only ever see `Arc<dyn KvStore>`; the concrete handle is kept
/// for lifecycle work (the memory sweeper, disconnect on shutdown).
#[derive(Clone)]
pub enum StoreBackend {
    Redis(Arc<RedisStore>),
    Memory(Arc<MemoryStore>),
}

impl StoreBackend {
    /// Builds the backend selected by `CACHE_BACKEND`.
    ///
    /// The Redis client is lazy: nothing is dialled until the first command.
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        match config.backend {
            BackendKind::Redis => Ok(Self::Redis(Arc::new(RedisStore::new(config.store_config())?))),
            BackendKind::Memory => Ok(Self::Memory(Arc::new(MemoryStore::new()))),
        }
    }

    pub fn store(&self) -> Arc<dyn KvStore> {
        match self {
            Self::Redis(store) => store.clone(),
            Self::Memory(store) => store.clone(),
        }
    }

    /// The in-process store, when that is the active backend.
    pub fn memory(&self) -> Option<Arc<MemoryStore>> {
        match self {
            Self::Memory(store) => Some(store.clone()),
            Self::Redis(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }

    /// Releases the remote connection. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Self::Redis(store) = self {
            store.disconnect().await;
        }
    }
}
