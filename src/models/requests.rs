//! Request DTOs for the operational API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::keys::CACHE_NAMESPACES;
use crate::cache::CacheKeys;
use crate::invalidation::InvalidationTarget;

/// Longest key or pattern accepted for manual invalidation
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for `POST /cache/invalidate`
///
/// Exactly one of `key`, `pattern` or `namespace` must be given; a `namespace` is
/// shorthand for the pattern `namespace:*`. Targets must start with a literal
/// cache namespace, so limiter counters are out of reach.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    /// Exact key to delete
    #[serde(default)]
    pub key: Option<String>,
    /// Glob pattern to delete
    #[serde(default)]
    pub pattern: Option<String>,
    /// Namespace prefix to delete
    #[serde(default)]
    pub namespace: Option<String>,
}

impl InvalidateRequest {
    /// Validates the request and resolves its target.
    pub fn target(&self) -> Result<InvalidationTarget, String> {
        let given = [&self.key, &self.pattern, &self.namespace]
            .iter()
            .filter(|field| field.is_some())
            .count();
        if given != 1 {
            return Err("Exactly one of key, pattern or namespace is required".to_string());
        }

        let target = if let Some(key) = &self.key {
            InvalidationTarget::Key(key.trim().to_string())
        } else if let Some(pattern) = &self.pattern {
            InvalidationTarget::Pattern(pattern.trim().to_string())
        } else {
            let namespace = self.namespace.as_deref().unwrap_or_default().trim();
            if namespace.is_empty() {
                return Err("Namespace cannot be empty".to_string());
            }
            InvalidationTarget::Pattern(CacheKeys::pattern(namespace))
        };

        let text = target.as_str();
        if text.is_empty() {
            return Err("Key or pattern cannot be empty".to_string());
        }
        if text.len() > MAX_KEY_LENGTH {
            return Err(format!(
                "Key or pattern exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        let namespace = text.split(':').next().unwrap_or_default();
        if !CACHE_NAMESPACES.contains(&namespace) {
            return Err(format!(
                "Target must start with one of the cache namespaces: {}",
                CACHE_NAMESPACES.join(", ")
            ));
        }

        Ok(target)
    }
}
