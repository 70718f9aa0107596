//! Cache Key and TTL Policy
//!
//! Every writer and every invalidator builds keys through [`CacheKeys`], so
//! the two sides always agree on names. Keys are colon-delimited:
//! `namespace:ROLE:user:page:limit`. All keys of one scope share the
//! `namespace:ROLE:user` prefix and can be dropped with
//! [`CacheKeys::pattern`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Role ==
/// Scope discriminator for list views: what a user may see depends on role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Agent,
    Tenant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Agent => "AGENT",
            Role::Tenant => "TENANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Page Slice ==
/// Pagination discriminator of a cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice {
    pub page: u32,
    pub limit: u32,
}

impl PageSlice {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }
}

impl Default for PageSlice {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

// == Namespaces ==
pub const PROPERTIES: &str = "properties";
pub const PROPERTY: &str = "property";
pub const TICKETS: &str = "tickets";
pub const TICKET: &str = "ticket";
pub const INVOICES: &str = "invoices";
pub const INVOICE: &str = "invoice";
pub const INSPECTIONS: &str = "inspections";
pub const INSPECTION: &str = "inspection";
pub const DASHBOARD: &str = "dashboard";
pub const USER: &str = "user";
pub const RATE_LIMIT: &str = "ratelimit";

/// Namespaces holding cached views. Limiter counters live outside them.
pub const CACHE_NAMESPACES: [&str; 10] = [
    PROPERTIES,
    PROPERTY,
    TICKETS,
    TICKET,
    INVOICES,
    INVOICE,
    INSPECTIONS,
    INSPECTION,
    DASHBOARD,
    USER,
];

// == Cache Keys ==
/// Key builders shared by cache writers and invalidators.
pub struct CacheKeys;

impl CacheKeys {
    /// `namespace:ROLE:user`: the prefix of every page of one list scope.
    pub fn scope(namespace: &str, role: Role, user_id: &str) -> String {
        format!("{}:{}:{}", namespace, role, user_id)
    }

    /// `namespace:ROLE:user:page:limit`
    pub fn list(namespace: &str, role: Role, user_id: &str, slice: PageSlice) -> String {
        format!(
            "{}:{}:{}",
            Self::scope(namespace, role, user_id),
            slice.page,
            slice.limit
        )
    }

    pub fn properties(role: Role, user_id: &str, slice: PageSlice) -> String {
        Self::list(PROPERTIES, role, user_id, slice)
    }

    pub fn properties_scope(role: Role, user_id: &str) -> String {
        Self::scope(PROPERTIES, role, user_id)
    }

    pub fn property(property_id: &str) -> String {
        format!("{}:{}", PROPERTY, property_id)
    }

    pub fn tickets(role: Role, user_id: &str, slice: PageSlice) -> String {
        Self::list(TICKETS, role, user_id, slice)
    }

    pub fn tickets_scope(role: Role, user_id: &str) -> String {
        Self::scope(TICKETS, role, user_id)
    }

    pub fn ticket(ticket_id: &str) -> String {
        format!("{}:{}", TICKET, ticket_id)
    }

    pub fn invoices(role: Role, user_id: &str, slice: PageSlice) -> String {
        Self::list(INVOICES, role, user_id, slice)
    }

    pub fn invoices_scope(role: Role, user_id: &str) -> String {
        Self::scope(INVOICES, role, user_id)
    }

    pub fn invoice(invoice_id: &str) -> String {
        format!("{}:{}", INVOICE, invoice_id)
    }

    pub fn inspections(role: Role, user_id: &str, slice: PageSlice) -> String {
        Self::list(INSPECTIONS, role, user_id, slice)
    }

    pub fn inspections_scope(role: Role, user_id: &str) -> String {
        Self::scope(INSPECTIONS, role, user_id)
    }

    pub fn inspection(inspection_id: &str) -> String {
        format!("{}:{}", INSPECTION, inspection_id)
    }

    /// Per-user dashboard aggregate.
    pub fn dashboard(role: Role, user_id: &str) -> String {
        Self::scope(DASHBOARD, role, user_id)
    }

    pub fn user(user_id: &str) -> String {
        format!("{}:{}", USER, user_id)
    }

    /// Counter key of the fixed-window rate limiter.
    pub fn rate_limit(subject: &str, action: &str) -> String {
        format!("{}:{}:{}", RATE_LIMIT, subject, action)
    }

    /// Wildcard over everything below `prefix`. The prefix is matched
    /// literally, glob characters in ids included.
    pub fn pattern(prefix: &str) -> String {
        format!("{}:*", Self::escape_glob(prefix))
    }

    /// Backslash-escapes `*`, `?`, `[`, `]` and `\`.
    pub fn escape_glob(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }
}

// == Cache TTL ==
/// Standard lifetimes for cached entries.
pub struct CacheTtl;

impl CacheTtl {
    /// Frequently changing list views
    pub const SHORT: Duration = Duration::from_secs(60);
    pub const MEDIUM: Duration = Duration::from_secs(300);
    pub const LONG: Duration = Duration::from_secs(3600);
    pub const DAY: Duration = Duration::from_secs(86_400);
}
