//! API Module
//!
//! Operational HTTP surface of the caching layer.
//!
//! # Endpoints
//! - `GET /health` - Store reachability
//! - `GET /stats` - Cache counters
//! - `POST /cache/invalidate` - Drop a key or pattern

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
