//! Fixed-window request counter.
//!
//! One counter per (subject, action). The first hit of a window creates the
//! counter and starts its expiry; later hits only increment. The window does
//! not slide, so a burst straddling two windows can admit up to twice the
//! allowance.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::rules::RateLimitRules;
use crate::cache::{CacheKeys, CacheService};

// == Rate Limit Decision ==
/// Result of one rate limit check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Allowance for the window
    pub limit: u32,
    /// Requests left in the window
    pub remaining: u32,
    /// Requests counted in the window, this one included (0 when unknown)
    pub current: i64,
    /// Now plus the window length, not the counter's exact expiry
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until `reset_at`, at least 1.
    pub fn retry_after_secs(&self) -> u64 {
        let millis = (self.reset_at - Utc::now()).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000).max(1)
    }

    /// `X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`
    /// (Unix seconds).
    pub fn headers(&self) -> [(HeaderName, HeaderValue); 3] {
        [
            (
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(self.limit),
            ),
            (
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(self.remaining),
            ),
            (
                HeaderName::from_static("x-ratelimit-reset"),
                HeaderValue::from(self.reset_at.timestamp()),
            ),
        ]
    }
}

// == Rate Limiter ==
/// Fixed-window limiter on top of the cache service's counters.
#[derive(Clone)]
pub struct RateLimiter {
    cache: CacheService,
    rules: Arc<RateLimitRules>,
}

impl RateLimiter {
    /// A limiter using the standard rule table.
    pub fn new(cache: CacheService) -> Self {
        Self::with_rules(cache, RateLimitRules::standard())
    }

    pub fn with_rules(cache: CacheService, rules: RateLimitRules) -> Self {
        Self {
            cache,
            rules: Arc::new(rules),
        }
    }

    pub fn rules(&self) -> &RateLimitRules {
        &self.rules
    }

    // == Check ==
    /// Counts one request of `subject` doing `action` and decides whether it
    /// fits within `max_requests` per `window`.
    ///
    /// When the store cannot count, the request is allowed with the full
    /// allowance remaining.
    pub async fn check(
        &self,
        subject: &str,
        action: &str,
        max_requests: u32,
        window: Duration,
    ) -> RateLimitDecision {
        let key = CacheKeys::rate_limit(subject, action);
        let count = self.cache.increment_with_expiry(&key, window).await;
        let reset_at = Utc::now()
            + chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::zero());

        if count <= 0 {
            warn!(subject, action, "Rate limiting unavailable, allowing request");
            return RateLimitDecision {
                allowed: true,
                limit: max_requests,
                remaining: max_requests,
                current: 0,
                reset_at,
            };
        }

        let allowed = count <= i64::from(max_requests);
        let remaining = (i64::from(max_requests) - count).max(0) as u32;

        if allowed {
            debug!(subject, action, count, max_requests, "Rate limit check passed");
        } else {
            warn!(subject, action, count, max_requests, "Rate limit exceeded");
        }

        RateLimitDecision {
            allowed,
            limit: max_requests,
            remaining,
            current: count,
            reset_at,
        }
    }

    /// [`check`](Self::check) with the rule configured for `action`.
    pub async fn check_action(&self, subject: &str, action: &str) -> RateLimitDecision {
        let rule = self.rules.rule_for(action);
        self.check(subject, action, rule.max_requests, rule.window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::rules::{actions, RateLimitRule};
    use crate::store::{MemoryStore, RedisStore, StoreConfig};

    fn limiter() -> RateLimiter {
        RateLimiter::new(CacheService::new(Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn test_fixed_window_sequence() {
        let limiter = limiter();
        let window = Duration::from_secs(60);

        let mut allowed = Vec::new();
        let mut remaining = Vec::new();
        for _ in 0..6 {
            let decision = limiter.check("tenant-1", "ticket_create", 5, window).await;
            allowed.push(decision.allowed);
            remaining.push(decision.remaining);
        }

        assert_eq!(allowed, vec![true, true, true, true, true, false]);
        assert_eq!(remaining, vec![4, 3, 2, 1, 0, 0]);
    }

    #[tokio::test]
    async fn test_subjects_and_actions_are_independent() {
        let limiter = limiter();
        let window = Duration::from_secs(60);

        limiter.check("a", "pay", 1, window).await;
        assert!(!limiter.check("a", "pay", 1, window).await.allowed);
        assert!(limiter.check("b", "pay", 1, window).await.allowed);
        assert!(limiter.check("a", "comment", 1, window).await.allowed);
    }

    #[tokio::test]
    async fn test_window_reset() {
        let limiter = limiter();
        let window = Duration::from_secs(1);

        limiter.check("tenant-1", "pay", 1, window).await;
        assert!(!limiter.check("tenant-1", "pay", 1, window).await.allowed);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let decision = limiter.check("tenant-1", "pay", 1, window).await;
        assert!(decision.allowed);
        assert_eq!(decision.current, 1);
    }

    #[tokio::test]
    async fn test_reset_at_is_now_plus_window() {
        let limiter = limiter();
        let before = Utc::now();

        let decision = limiter.check("u", "a", 3, Duration::from_secs(60)).await;

        let delta = (decision.reset_at - before).num_seconds();
        assert!((59..=60).contains(&delta));
        assert!((59..=60).contains(&decision.retry_after_secs()));
    }

    #[tokio::test]
    async fn test_fail_open_when_store_unreachable() {
        let store = RedisStore::new(StoreConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_millis(200),
            max_retries: 1,
            command_timeout: Duration::from_millis(200),
            ..StoreConfig::default()
        })
        .unwrap();
        let limiter = RateLimiter::new(CacheService::new(Arc::new(store)));

        let decision = limiter.check("tenant-1", "pay", 5, Duration::from_secs(60)).await;

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 5);
        assert_eq!(decision.current, 0);
    }

    #[tokio::test]
    async fn test_check_action_uses_rule_table() {
        let cache = CacheService::new(Arc::new(MemoryStore::new()));
        let rules = RateLimitRules::standard().with_rule(actions::INVOICE_PAYMENT, RateLimitRule::new(2, 60));
        let limiter = RateLimiter::with_rules(cache, rules);

        let first = limiter.check_action("t", actions::INVOICE_PAYMENT).await;
        assert_eq!(first.limit, 2);
        assert_eq!(first.remaining, 1);

        limiter.check_action("t", actions::INVOICE_PAYMENT).await;
        assert!(!limiter.check_action("t", actions::INVOICE_PAYMENT).await.allowed);

        let fallback = limiter.check_action("t", "unlisted").await;
        assert_eq!(fallback.limit, 100);
    }

    #[test]
    fn test_headers() {
        let decision = RateLimitDecision {
            allowed: true,
            limit: 10,
            remaining: 7,
            current: 3,
            reset_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };

        let headers = decision.headers();
        assert_eq!(headers[0].1, "10");
        assert_eq!(headers[1].1, "7");
        assert_eq!(headers[2].1, "1700000000");
    }
}
