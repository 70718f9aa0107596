//! Per-action rate limit table.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

/// Action names guarded by the rate limiter.
pub mod actions {
    pub const TICKET_CREATE: &str = "ticket_create";
    pub const TICKET_COMMENT: &str = "ticket_comment";
    pub const INVOICE_PAYMENT: &str = "invoice_payment";
    pub const INSPECTION_SCHEDULE: &str = "inspection_schedule";
    pub const PROPERTY_WRITE: &str = "property_write";
    pub const CACHE_INVALIDATE: &str = "cache_invalidate";
}

// == Rate Limit Rule ==
/// Allowance for one action: at most `max_requests` per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitRule {
    pub max_requests: u32,
    #[serde(rename = "window_secs", serialize_with = "serialize_secs")]
    pub window: Duration,
}

impl RateLimitRule {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

fn serialize_secs<S: serde::Serializer>(window: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(window.as_secs())
}

/// Applied to any action without its own entry.
pub const DEFAULT_RULE: RateLimitRule = RateLimitRule::new(100, 60);

// == Rate Limit Rules ==
/// Static action → rule table with a fallback.
#[derive(Debug, Clone)]
pub struct RateLimitRules {
    rules: HashMap<String, RateLimitRule>,
    fallback: RateLimitRule,
}

impl RateLimitRules {
    /// An empty table that answers `fallback` for every action.
    pub fn new(fallback: RateLimitRule) -> Self {
        Self {
            rules: HashMap::new(),
            fallback,
        }
    }

    /// The table used by the application.
    pub fn standard() -> Self {
        Self::new(DEFAULT_RULE)
            .with_rule(actions::TICKET_CREATE, RateLimitRule::new(10, 3600))
            .with_rule(actions::TICKET_COMMENT, RateLimitRule::new(30, 600))
            .with_rule(actions::INVOICE_PAYMENT, RateLimitRule::new(5, 300))
            .with_rule(actions::INSPECTION_SCHEDULE, RateLimitRule::new(20, 3600))
            .with_rule(actions::PROPERTY_WRITE, RateLimitRule::new(30, 3600))
            .with_rule(actions::CACHE_INVALIDATE, RateLimitRule::new(10, 60))
    }

    pub fn with_rule(mut self, action: impl Into<String>, rule: RateLimitRule) -> Self {
        self.rules.insert(action.into(), rule);
        self
    }

    /// The rule for `action`, or the fallback.
    pub fn rule_for(&self, action: &str) -> RateLimitRule {
        self.rules.get(action).copied().unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> RateLimitRule {
        self.fallback
    }
}

impl Default for RateLimitRules {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rules() {
        let rules = RateLimitRules::standard();

        let payment = rules.rule_for(actions::INVOICE_PAYMENT);
        assert_eq!(payment.max_requests, 5);
        assert_eq!(payment.window, Duration::from_secs(300));

        assert_eq!(rules.rule_for(actions::TICKET_CREATE).max_requests, 10);
    }

    #[test]
    fn test_unknown_action_falls_back() {
        let rules = RateLimitRules::standard();
        assert_eq!(rules.rule_for("export_report"), DEFAULT_RULE);
        assert_eq!(rules.fallback(), DEFAULT_RULE);
    }

    #[test]
    fn test_with_rule_overrides() {
        let rules = RateLimitRules::standard().with_rule(actions::TICKET_CREATE, RateLimitRule::new(1, 5));
        assert_eq!(rules.rule_for(actions::TICKET_CREATE), RateLimitRule::new(1, 5));
    }

    #[test]
    fn test_rule_serializes_window_in_seconds() {
        let json = serde_json::to_value(RateLimitRule::new(5, 300)).unwrap();
        assert_eq!(json, serde_json::json!({ "max_requests": 5, "window_secs": 300 }));
    }
}
