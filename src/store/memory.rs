//! Memory Store Module
//!
//! In-process key-value backend: a HashMap of [`StoredEntry`] values with
//! TTL expiration, behind an async RwLock. Mirrors the store semantics the
//! cache core depends on (INCR keeps the TTL, EXPIRE 0 deletes, glob KEYS).

use std::collections::HashMap;

use async_trait::async_trait;
use redis::ErrorKind;
use tokio::sync::RwLock;

use super::{current_timestamp_ms, KeyPattern, KvStore, StoredEntry};
use crate::error::{StoreError, StoreResult};

// == Memory Store ==
/// Key-value storage held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Key-value storage
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remaining TTL of `key` in seconds; `None` when absent or persistent.
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(StoredEntry::ttl_remaining)
    }
}

/// Increments the counter under `key`, creating it at 1 if absent or expired.
fn increment_entry(entries: &mut HashMap<String, StoredEntry>, key: &str) -> StoreResult<i64> {
    if let Some(entry) = entries.get_mut(key) {
        if !entry.is_expired() {
            let current: i64 = entry
                .value
                .parse()
                .map_err(|_| StoreError::NotAnInteger(key.to_string()))?;
            let next = current.checked_add(1).ok_or_else(|| StoreError::Command {
                command: "INCR",
                source: (ErrorKind::ResponseError, "increment would overflow").into(),
            })?;
            entry.replace_value(next.to_string());
            return Ok(next);
        }
    }

    entries.insert(key.to_string(), StoredEntry::new("1".to_string(), None));
    Ok(1)
}

fn reject_zero_ttl(command: &'static str, ttl_secs: u64) -> StoreResult<()> {
    if ttl_secs == 0 {
        return Err(StoreError::Command {
            command,
            source: (ErrorKind::ResponseError, "invalid expire time").into(),
        });
    }
    Ok(())
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()> {
        reject_zero_ttl("SETEX", ttl_secs)?;
        let entry = StoredEntry::new(value.to_string(), Some(ttl_secs));
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write().await;
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired_at(now))
            .count();
        Ok(removed as u64)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let pattern = KeyPattern::new(pattern);
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired_at(now) && pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).is_some_and(|entry| !entry.is_expired()))
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<bool> {
        reject_zero_ttl("SET", ttl_secs)?;
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_expired()) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            StoredEntry::new(value.to_string(), Some(ttl_secs)),
        );
        Ok(true)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut entries = self.entries.write().await;
        increment_entry(&mut entries, key)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> StoreResult<bool> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(key) else {
            return Ok(false);
        };
        if entry.is_expired() {
            entries.remove(key);
            return Ok(false);
        }
        if ttl_secs == 0 {
            entries.remove(key);
            return Ok(true);
        }
        entry.expire_in(ttl_secs);
        Ok(true)
    }

    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> StoreResult<i64> {
        let mut entries = self.entries.write().await;
        let count = increment_entry(&mut entries, key)?;
        if count == 1 {
            if let Some(entry) = entries.get_mut(key) {
                entry.expire_in(ttl_secs);
            }
        }
        Ok(count)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
