//! Stored Entry Module
//!
//! A single value held by the in-process backend, with its expiry.

use chrono::Utc;

// == Stored Entry ==
/// A value held by [`MemoryStore`](super::MemoryStore) plus its lifetime metadata.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored value (JSON text or a decimal counter)
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a new entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - Optional TTL in seconds
    pub fn new(value: String, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();

        Self {
            value,
            expires_at: ttl_seconds.map(|ttl| now + ttl * 1000),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied clock.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now_ms >= expires)
    }

    // == Expire ==
    /// Resets the remaining lifetime to `ttl_seconds` from now, keeping the value.
    pub fn expire_in(&mut self, ttl_seconds: u64) {
        self.expires_at = Some(current_timestamp_ms() + ttl_seconds * 1000);
    }

    /// Replaces the value in place of a counter update; expiry is preserved.
    pub fn replace_value(&mut self, value: String) {
        self.value = value;
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        let now = current_timestamp_ms();
        self.expires_at.map(|expires| expires.saturating_sub(now))
    }

    /// Returns remaining TTL in seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms / 1000)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = StoredEntry::new("test_value".to_string(), None);

        assert_eq!(entry.value, "test_value");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = StoredEntry::new("test_value".to_string(), Some(60));

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = StoredEntry::new("test_value".to_string(), Some(1));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_replace_value_keeps_expiry() {
        let mut entry = StoredEntry::new("1".to_string(), Some(60));
        let expires_at = entry.expires_at;

        entry.replace_value("2".to_string());

        assert_eq!(entry.value, "2");
        assert_eq!(entry.expires_at, expires_at);
    }

    #[test]
    fn test_expire_in_adds_ttl_to_persistent_entry() {
        let mut entry = StoredEntry::new("value".to_string(), None);
        assert!(entry.ttl_remaining().is_none());

        entry.expire_in(30);

        let remaining = entry.ttl_remaining().unwrap();
        assert!((29..=30).contains(&remaining));
    }

    #[test]
    fn test_ttl_remaining_expired() {
        let entry = StoredEntry::new("test_value".to_string(), Some(1));

        sleep(Duration::from_millis(1100));

        assert_eq!(entry.ttl_remaining().unwrap(), 0);
        assert_eq!(entry.ttl_remaining_ms().unwrap(), 0);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = StoredEntry {
            value: "test".to_string(),
            expires_at: Some(now),
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(now - 1));
    }
}
