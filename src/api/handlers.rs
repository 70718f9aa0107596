//! API Handlers
//!
//! HTTP request handlers for the operational endpoints.

use axum::{extract::State, Json};
use tracing::info;

use crate::cache::CacheService;
use crate::error::{ApiError, Result};
use crate::invalidation::Invalidator;
use crate::models::{HealthResponse, InvalidateRequest, InvalidateResponse, StatsResponse};
use crate::rate_limit::RateLimiter;
use crate::store::StoreBackend;

/// Application state shared across all handlers.
///
/// Every member is a cheap handle over the same store.
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheService,
    pub limiter: RateLimiter,
    pub invalidator: Invalidator,
    /// Whether the rate limiter may read caller identity from headers
    pub trust_identity_headers: bool,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: CacheService) -> Self {
        Self {
            limiter: RateLimiter::new(cache.clone()),
            invalidator: Invalidator::new(cache.clone()),
            cache,
            trust_identity_headers: false,
        }
    }

    /// Lets `x-user-id`/`x-forwarded-for` name the rate-limit subject.
    pub fn trusting_identity_headers(mut self, trusted: bool) -> Self {
        self.trust_identity_headers = trusted;
        self
    }

    /// Creates a new AppState on top of the configured backend.
    pub fn from_backend(backend: &StoreBackend) -> Self {
        Self::new(CacheService::new(backend.store()))
    }
}

/// Handler for GET /health
///
/// Always answers 200; an unreachable store only degrades the status.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_store(state.cache.is_available().await))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for POST /cache/invalidate
///
/// Drops one key or every key matching a pattern.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let target = req.target().map_err(ApiError::InvalidRequest)?;

    let removed = state.invalidator.invalidate(&target).await;
    info!(target = target.as_str(), removed, "Manual cache invalidation");

    Ok(Json(InvalidateResponse::new(target.as_str(), removed)))
}
