//! API Routes
//!
//! Configures the Axum router with the operational endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, invalidate_handler, stats_handler, AppState};
use crate::rate_limit::{actions, enforce, RateLimitGuard};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Store reachability
/// - `GET /stats` - Cache counters
/// - `POST /cache/invalidate` - Drop a key or pattern (rate limited)
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let invalidate_guard = RateLimitGuard::new(state.limiter.clone(), actions::CACHE_INVALIDATE)
        .trusting_client_headers(state.trust_identity_headers);

    Router::new()
        .route(
            "/cache/invalidate",
            post(invalidate_handler)
                .layer(middleware::from_fn_with_state(invalidate_guard, enforce)),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
