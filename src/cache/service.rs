//! Cache Service Module
//!
//! Generic caching primitives over a [`KvStore`]. Every operation contains
//! its own failures: a store outage turns reads into misses, writes into
//! `false`, counters into `0`. Nothing here returns an error to the caller.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::payload;
use super::stats::{CacheStats, StatsRecorder};
use crate::store::KvStore;

// == Lookup ==
/// Outcome of a read-through lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T, E> {
    /// Served from the cache; the producer did not run
    Hit(T),
    /// Produced on a miss and written back
    Computed(T),
    /// The producer failed; nothing was cached
    Failed(E),
}

impl<T, E> Lookup<T, E> {
    /// The value, if there is one. A producer failure becomes `None`.
    pub fn into_value(self) -> Option<T> {
        match self {
            Lookup::Hit(value) | Lookup::Computed(value) => Some(value),
            Lookup::Failed(_) => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

}

// == Cache Service ==
/// Cache-aside primitives shared by the business layer and the rate limiter.
///
/// Cheap to clone; clones share the store handle and the statistics.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn KvStore>,
    stats: Arc<StatsRecorder>,
}

impl CacheService {
    // == Constructor ==
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            stats: Arc::new(StatsRecorder::new()),
        }
    }

    // == Get ==
    /// Fetches and deserializes `key`. A store error or an unreadable payload
    /// is reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw,
            Err(err) => {
                self.stats.record_store_error();
                self.stats.record_miss();
                warn!(key, error = %err, "Cache get failed");
                return None;
            }
        };

        let Some(raw) = raw else {
            self.stats.record_miss();
            debug!(key, "Cache miss");
            return None;
        };

        match payload::decode(&raw) {
            Ok(value) => {
                self.stats.record_hit();
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(err) => {
                self.stats.record_miss();
                warn!(key, error = %err, "Discarding unreadable cache payload");
                None
            }
        }
    }

    // == Set ==
    /// Serializes `value` and stores it under `key` for `ttl`.
    ///
    /// Returns whether the write reached the store.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let text = match payload::encode(value) {
            Ok(text) => text,
            Err(err) => {
                self.stats.record_write_failure();
                warn!(key, error = %err, "Cache value could not be serialized");
                return false;
            }
        };

        match self.store.set_ex(key, &text, ttl_secs(ttl)).await {
            Ok(()) => {
                self.stats.record_write();
                true
            }
            Err(err) => {
                self.stats.record_store_error();
                self.stats.record_write_failure();
                warn!(key, error = %err, "Cache set failed");
                false
            }
        }
    }

    // == Delete ==
    /// Removes `key`. Deleting an absent key is a success.
    pub async fn del(&self, key: &str) -> bool {
        self.delete(key).await.is_some()
    }

    /// Removes `key` in one round trip and reports how many keys the store
    /// dropped: 1, or 0 when it was not cached or the store failed.
    pub async fn remove(&self, key: &str) -> u64 {
        self.delete(key).await.unwrap_or(0)
    }

    async fn delete(&self, key: &str) -> Option<u64> {
        match self.store.del(&[key.to_string()]).await {
            Ok(removed) => {
                self.stats.record_invalidated(removed);
                Some(removed)
            }
            Err(err) => {
                self.stats.record_store_error();
                warn!(key, error = %err, "Cache delete failed");
                None
            }
        }
    }

    // == Delete Pattern ==
    /// Removes every key matching the glob `pattern` in one batch.
    ///
    /// Returns how many keys were removed; 0 on no match or on error.
    pub async fn del_pattern(&self, pattern: &str) -> u64 {
        let keys = match self.store.keys(pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                self.stats.record_store_error();
                warn!(pattern, error = %err, "Cache pattern lookup failed");
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match self.store.del(&keys).await {
            Ok(removed) => {
                self.stats.record_invalidated(removed);
                debug!(pattern, removed, "Invalidated cache pattern");
                removed
            }
            Err(err) => {
                self.stats.record_store_error();
                warn!(pattern, error = %err, "Cache pattern delete failed");
                0
            }
        }
    }

    // == Exists ==
    pub async fn exists(&self, key: &str) -> bool {
        self.store.exists(key).await.unwrap_or_else(|err| {
            self.stats.record_store_error();
            warn!(key, error = %err, "Cache exists check failed");
            false
        })
    }

    // == Set If Absent ==
    /// Stores `value` only if `key` is not already present.
    ///
    /// Returns whether this call wrote the value. Suitable for advisory locks
    /// and idempotency guards.
    pub async fn set_if_absent<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> bool {
        let text = match payload::encode(value) {
            Ok(text) => text,
            Err(err) => {
                warn!(key, error = %err, "Cache value could not be serialized");
                return false;
            }
        };

        self.store
            .set_nx_ex(key, &text, ttl_secs(ttl))
            .await
            .unwrap_or_else(|err| {
                self.stats.record_store_error();
                warn!(key, error = %err, "Cache set-if-absent failed");
                false
            })
    }

    // == Increment ==
    /// Atomically increments the counter at `key`, creating it at 1.
    ///
    /// Returns the new value, or 0 when the store failed.
    pub async fn increment(&self, key: &str) -> i64 {
        self.store.incr(key).await.unwrap_or_else(|err| {
            self.stats.record_store_error();
            warn!(key, error = %err, "Cache increment failed");
            0
        })
    }

    /// Increments `key` and, when that created the counter, gives it `window`
    /// to live. Both happen as one store-side step.
    ///
    /// Returns the new value, or 0 when the store failed.
    pub async fn increment_with_expiry(&self, key: &str, window: Duration) -> i64 {
        self.store
            .incr_with_expiry(key, ttl_secs(window))
            .await
            .unwrap_or_else(|err| {
                self.stats.record_store_error();
                warn!(key, error = %err, "Cache windowed increment failed");
                0
            })
    }

    // == Expire ==
    /// Resets the remaining lifetime of `key` without touching its value.
    pub async fn expire(&self, key: &str, ttl: Duration) -> bool {
        self.store
            .expire(key, ttl_secs(ttl))
            .await
            .unwrap_or_else(|err| {
                self.stats.record_store_error();
                warn!(key, error = %err, "Cache expire failed");
                false
            })
    }

    // == Fetch ==
    /// Read-through lookup that keeps producer failures distinguishable.
    ///
    /// On a hit the producer is not invoked. On a miss it runs once; its value
    /// is written back under `key` for `ttl` and returned even if the write
    /// fails. A producer error is logged, counted, and returned as
    /// [`Lookup::Failed`].
    pub async fn fetch<T, F, Fut, E>(&self, key: &str, ttl: Duration, producer: F) -> Lookup<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if let Some(cached) = self.get(key).await {
            return Lookup::Hit(cached);
        }

        match producer().await {
            Ok(value) => {
                self.set(key, &value, ttl).await;
                Lookup::Computed(value)
            }
            Err(err) => {
                self.stats.record_producer_error();
                error!(key, error = %err, "Cache producer failed, returning no value");
                Lookup::Failed(err)
            }
        }
    }

    // == Get Or Set ==
    /// Read-through lookup returning only the value.
    ///
    /// A producer failure yields `None`, exactly like "nothing to show"; use
    /// [`fetch`](Self::fetch) where the difference matters.
    pub async fn get_or_set<T, F, Fut, E>(&self, key: &str, ttl: Duration, producer: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.fetch(key, ttl, producer).await.into_value()
    }

    // == Health ==
    /// Whether the store answers a PING right now.
    pub async fn is_available(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(err) => {
                self.stats.record_store_error();
                debug!(error = %err, "Cache store ping failed");
                false
            }
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

/// Whole seconds, rounded up, never below one.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
