//! Rate Limit Module
//!
//! Per-subject, per-action request counting in fixed time windows, built on
//! the cache service's counters, plus the axum middleware that turns a
//! rejection into HTTP 429.

mod limiter;
mod middleware;
mod rules;

pub use limiter::{RateLimitDecision, RateLimiter};
pub use middleware::{enforce, subject_of, RateLimitGuard, Subject, ANONYMOUS, USER_ID_HEADER};
pub use rules::{actions, RateLimitRule, RateLimitRules, DEFAULT_RULE};
