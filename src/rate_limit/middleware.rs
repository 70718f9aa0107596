//! Axum middleware that rate-limits a route by action.
//!
//! ```ignore
//! let guard = RateLimitGuard::new(limiter, actions::TICKET_CREATE);
//! Router::new().route(
//!     "/tickets",
//!     post(create_ticket).layer(middleware::from_fn_with_state(guard, enforce)),
//! );
//! ```

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::limiter::RateLimiter;
use crate::error::ApiError;

/// Header carrying the caller id, honoured only behind a trusted proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Fallback subject for requests that carry no identity.
pub const ANONYMOUS: &str = "anonymous";

// == Subject ==
/// Identity of the caller, inserted as a request extension by the
/// authentication layer in front of the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);

// == Rate Limit Guard ==
/// Middleware state: which limiter, guarding which action.
#[derive(Clone)]
pub struct RateLimitGuard {
    limiter: RateLimiter,
    action: String,
    trust_client_headers: bool,
}

impl RateLimitGuard {
    pub fn new(limiter: RateLimiter, action: impl Into<String>) -> Self {
        Self {
            limiter,
            action: action.into(),
            trust_client_headers: false,
        }
    }

    /// Whether `x-user-id` and `x-forwarded-for` identify the caller. Only
    /// safe when a proxy in front of the service sets them.
    pub fn trusting_client_headers(mut self, trusted: bool) -> Self {
        self.trust_client_headers = trusted;
        self
    }
}

/// Resolves who is making the request.
///
/// Order: the [`Subject`] extension; when `trust_client_headers` is set, the
/// `x-user-id` header and then the first `x-forwarded-for` hop; the peer IP
/// from [`ConnectInfo`]; finally [`ANONYMOUS`].
pub fn subject_of(request: &Request, trust_client_headers: bool) -> String {
    if let Some(Subject(id)) = request.extensions().get::<Subject>() {
        return id.clone();
    }

    if trust_client_headers {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        if let Some(user_id) = header(USER_ID_HEADER) {
            return user_id.to_string();
        }

        let forwarded = header("x-forwarded-for")
            .and_then(|hops| hops.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(peer)| peer.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

// == Enforce ==
/// Rejects the request with 429 once the subject's allowance for the guarded
/// action is used up; otherwise forwards it and stamps the rate limit headers
/// on the response.
pub async fn enforce(State(guard): State<RateLimitGuard>, request: Request, next: Next) -> Response {
    let subject = subject_of(&request, guard.trust_client_headers);
    let decision = guard.limiter.check_action(&subject, &guard.action).await;

    if !decision.allowed {
        return ApiError::RateLimited {
            action: guard.action.clone(),
            decision,
        }
        .into_response();
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in decision.headers() {
        headers.insert(name, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheService;
    use crate::rate_limit::rules::{RateLimitRule, RateLimitRules};
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::post,
        Router,
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app(trust_client_headers: bool) -> Router {
        let cache = CacheService::new(Arc::new(MemoryStore::new()));
        let rules = RateLimitRules::standard().with_rule("ticket_create", RateLimitRule::new(2, 60));
        let guard = RateLimitGuard::new(RateLimiter::with_rules(cache, rules), "ticket_create")
            .trusting_client_headers(trust_client_headers);

        Router::new().route(
            "/tickets",
            post(|| async { "created" }).layer(middleware::from_fn_with_state(guard, enforce)),
        )
    }

    fn peer(last_octet: u8) -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([198, 51, 100, last_octet], 40_000)))
    }

    fn ticket_request(user: &str, from: ConnectInfo<SocketAddr>) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri("/tickets")
            .header(USER_ID_HEADER, user)
            .extension(from)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_allows_then_rejects() {
        let app = create_test_app(true);

        let first = app.clone().oneshot(ticket_request("tenant-1", peer(1))).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-ratelimit-limit"], "2");
        assert_eq!(first.headers()["x-ratelimit-remaining"], "1");

        let second = app.clone().oneshot(ticket_request("tenant-1", peer(1))).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()["x-ratelimit-remaining"], "0");

        let third = app.clone().oneshot(ticket_request("tenant-1", peer(1))).await.unwrap();
        assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(third.headers().contains_key("retry-after"));
        assert!(third.headers().contains_key("x-ratelimit-reset"));

        let other = app.oneshot(ticket_request("tenant-2", peer(1))).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rotating_user_header_keeps_peer_allowance() {
        let app = create_test_app(false);

        for user in ["tenant-1", "tenant-2"] {
            let response = app.clone().oneshot(ticket_request(user, peer(7))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let rotated = app.clone().oneshot(ticket_request("tenant-3", peer(7))).await.unwrap();
        assert_eq!(rotated.status(), StatusCode::TOO_MANY_REQUESTS);

        let other_peer = app.oneshot(ticket_request("tenant-3", peer(8))).await.unwrap();
        assert_eq!(other_peer.status(), StatusCode::OK);
    }

    #[test]
    fn test_subject_prefers_extension() {
        let mut request = HttpRequest::builder()
            .header(USER_ID_HEADER, "header-user")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(Subject("auth-user".to_string()));

        assert_eq!(subject_of(&request, true), "auth-user");
        assert_eq!(subject_of(&request, false), "auth-user");
    }

    #[test]
    fn test_subject_from_forwarded_for_when_trusted() {
        let request = HttpRequest::builder()
            .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
            .extension(peer(9))
            .body(Body::empty())
            .unwrap();

        assert_eq!(subject_of(&request, true), "203.0.113.7");
        assert_eq!(subject_of(&request, false), "198.51.100.9");
    }

    #[test]
    fn test_untrusted_headers_ignored() {
        let request = HttpRequest::builder()
            .header(USER_ID_HEADER, "spoofed")
            .body(Body::empty())
            .unwrap();

        assert_eq!(subject_of(&request, false), ANONYMOUS);
        assert_eq!(subject_of(&request, true), "spoofed");
    }

    #[test]
    fn test_subject_anonymous() {
        let request = HttpRequest::builder().body(Body::empty()).unwrap();
        assert_eq!(subject_of(&request, true), ANONYMOUS);
    }
}
