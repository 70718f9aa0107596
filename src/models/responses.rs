//! Response DTOs for the operational API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for `POST /cache/invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// The key or pattern that was targeted
    pub target: String,
    /// Number of keys removed
    pub removed: u64,
}

impl InvalidateResponse {
    pub fn new(target: impl Into<String>, removed: u64) -> Self {
        Self {
            target: target.into(),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        let hit_rate = stats.hit_rate();
        Self { stats, hit_rate }
    }
}

/// Response body for the health endpoint (GET /health)
///
/// The service stays up when the store is down; only the status degrades.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// "connected" or "unavailable"
    pub store: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a HealthResponse for the given store reachability.
    pub fn from_store(store_available: bool) -> Self {
        let (status, store) = if store_available {
            ("healthy", "connected")
        } else {
            ("degraded", "unavailable")
        };
        Self {
            status: status.to_string(),
            store: store.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
