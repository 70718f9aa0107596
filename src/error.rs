//! Error types for the cache core
//!
//! `StoreError` covers everything that can go wrong talking to the key-value
//! store. It never reaches business logic: the cache service and the rate
//! limiter absorb it. `ApiError` is what the HTTP surface turns into a
//! response.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::rate_limit::RateLimitDecision;

// == Store Error Enum ==
/// Failure of a single key-value store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No connection could be established within the retry budget
    #[error("Store unavailable after {attempts} attempt(s): {reason}")]
    Unavailable { attempts: u32, reason: String },

    /// The command did not complete within the per-call deadline
    #[error("Store command {command} timed out")]
    Timeout { command: &'static str },

    /// The store rejected or failed the command
    #[error("Store command {command} failed: {source}")]
    Command {
        command: &'static str,
        #[source]
        source: redis::RedisError,
    },

    /// INCR on a value that does not parse as an integer
    #[error("Value at {0} is not an integer")]
    NotAnInteger(String),
}

/// Convenience Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == API Error Enum ==
/// Errors surfaced by the operational HTTP endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Subject exceeded the allowance for an action
    #[error("Rate limit exceeded for {action}")]
    RateLimited {
        action: String,
        decision: RateLimitDecision,
    },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::RateLimited { decision, .. } => {
                let retry_after = decision.retry_after_secs();
                let body = Json(json!({
                    "error": format!(
                        "Too many requests. Please try again in {} seconds.",
                        retry_after
                    ),
                    "retry_after": retry_after,
                }));

                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                let headers = response.headers_mut();
                for (name, value) in decision.headers() {
                    headers.insert(name, value);
                }
                headers.insert(
                    HeaderName::from_static("retry-after"),
                    HeaderValue::from(retry_after),
                );
                response
            }
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_invalid_request_is_bad_request() {
        let response = ApiError::InvalidRequest("pattern is empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rate_limited_sets_headers() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            current: 6,
            reset_at: Utc::now() + Duration::seconds(60),
        };
        let response = ApiError::RateLimited {
            action: "ticket_create".to_string(),
            decision,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert!(headers.contains_key("x-ratelimit-reset"));

        let retry_after: u64 = headers["retry-after"].to_str().unwrap().parse().unwrap();
        assert!((59..=60).contains(&retry_after));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable {
            attempts: 3,
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Store unavailable after 3 attempt(s): connection refused"
        );
    }
}
