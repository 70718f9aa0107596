//! Invalidation hooks
//!
//! Writes go straight to the relational store; afterwards the business layer
//! reports what it changed as a [`Mutation`] and the [`Invalidator`] drops
//! every cached view that could now be stale. Scoped list views are removed
//! by wildcard over their `namespace:ROLE:user` prefix, single resources by
//! exact key.

use tracing::debug;

use crate::cache::keys::{DASHBOARD, INSPECTIONS, INVOICES, PROPERTIES, TICKETS};
use crate::cache::{CacheKeys, CacheService, Role};

// == Invalidation Target ==
/// One thing to delete from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    /// Exact key
    Key(String),
    /// Glob pattern
    Pattern(String),
}

impl InvalidationTarget {
    /// The key or pattern text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Key(text) | Self::Pattern(text) => text,
        }
    }

    fn scope(namespace: &str, role: Role, user_id: &str) -> Self {
        Self::Pattern(CacheKeys::pattern(&CacheKeys::scope(namespace, role, user_id)))
    }

    /// Every scope of the namespace viewed by `role`, e.g. all admin lists.
    fn role(namespace: &str, role: Role) -> Self {
        Self::Pattern(CacheKeys::pattern(&format!("{}:{}", namespace, role)))
    }

    fn namespace(namespace: &str) -> Self {
        Self::Pattern(CacheKeys::pattern(namespace))
    }
}

// == Mutation ==
/// A completed write in the business layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A property was created, edited, reassigned or removed
    PropertyChanged { property_id: String },
    /// A tenant filed a maintenance ticket
    TicketCreated {
        property_id: String,
        agent_id: String,
        tenant_id: String,
    },
    /// Status, priority, assignment or comments of a ticket changed
    TicketUpdated {
        ticket_id: String,
        agent_id: String,
        tenant_id: String,
    },
    /// An invoice was issued to a tenant
    InvoiceCreated { agent_id: String, tenant_id: String },
    /// Hosted checkout confirmed payment of an invoice
    InvoicePaid {
        invoice_id: String,
        agent_id: String,
        tenant_id: String,
    },
    /// An inspection was scheduled, rescheduled or completed
    InspectionScheduled {
        inspection_id: Option<String>,
        property_id: String,
        agent_id: String,
        tenant_id: Option<String>,
    },
    /// A user's profile or role changed
    UserChanged { user_id: String },
}

impl Mutation {
    /// Everything cached that this write may have made stale.
    pub fn targets(&self) -> Vec<InvalidationTarget> {
        use InvalidationTarget as T;

        match self {
            Mutation::PropertyChanged { property_id } => vec![
                T::Key(CacheKeys::property(property_id)),
                // Property lists are visible to every role and embed assignment.
                T::namespace(PROPERTIES),
                T::namespace(DASHBOARD),
            ],
            Mutation::TicketCreated {
                property_id,
                agent_id,
                tenant_id,
            } => vec![
                T::scope(TICKETS, Role::Agent, agent_id),
                T::scope(TICKETS, Role::Tenant, tenant_id),
                T::role(TICKETS, Role::Admin),
                T::Key(CacheKeys::property(property_id)),
                T::Key(CacheKeys::dashboard(Role::Agent, agent_id)),
                T::Key(CacheKeys::dashboard(Role::Tenant, tenant_id)),
                T::role(DASHBOARD, Role::Admin),
            ],
            Mutation::TicketUpdated {
                ticket_id,
                agent_id,
                tenant_id,
            } => vec![
                T::Key(CacheKeys::ticket(ticket_id)),
                T::scope(TICKETS, Role::Agent, agent_id),
                T::scope(TICKETS, Role::Tenant, tenant_id),
                T::role(TICKETS, Role::Admin),
                T::Key(CacheKeys::dashboard(Role::Agent, agent_id)),
                T::Key(CacheKeys::dashboard(Role::Tenant, tenant_id)),
                T::role(DASHBOARD, Role::Admin),
            ],
            Mutation::InvoiceCreated {
                agent_id,
                tenant_id,
            } => invoice_targets(agent_id, tenant_id),
            Mutation::InvoicePaid {
                invoice_id,
                agent_id,
                tenant_id,
            } => {
                let mut targets = vec![T::Key(CacheKeys::invoice(invoice_id))];
                targets.extend(invoice_targets(agent_id, tenant_id));
                targets
            }
            Mutation::InspectionScheduled {
                inspection_id,
                property_id,
                agent_id,
                tenant_id,
            } => {
                let mut targets = vec![
                    T::scope(INSPECTIONS, Role::Agent, agent_id),
                    T::role(INSPECTIONS, Role::Admin),
                    T::Key(CacheKeys::property(property_id)),
                    T::Key(CacheKeys::dashboard(Role::Agent, agent_id)),
                ];
                if let Some(inspection_id) = inspection_id {
                    targets.push(T::Key(CacheKeys::inspection(inspection_id)));
                }
                if let Some(tenant_id) = tenant_id {
                    targets.push(T::scope(INSPECTIONS, Role::Tenant, tenant_id));
                }
                targets
            }
            Mutation::UserChanged { user_id } => vec![
                T::Key(CacheKeys::user(user_id)),
                T::Key(CacheKeys::dashboard(Role::Admin, user_id)),
                T::Key(CacheKeys::dashboard(Role::Agent, user_id)),
                T::Key(CacheKeys::dashboard(Role::Tenant, user_id)),
            ],
        }
    }
}

fn invoice_targets(agent_id: &str, tenant_id: &str) -> Vec<InvalidationTarget> {
    use InvalidationTarget as T;

    vec![
        T::scope(INVOICES, Role::Agent, agent_id),
        T::scope(INVOICES, Role::Tenant, tenant_id),
        T::role(INVOICES, Role::Admin),
        T::Key(CacheKeys::dashboard(Role::Agent, agent_id)),
        T::Key(CacheKeys::dashboard(Role::Tenant, tenant_id)),
        T::role(DASHBOARD, Role::Admin),
    ]
}

// == Invalidator ==
/// Applies mutations to the cache.
#[derive(Clone)]
pub struct Invalidator {
    cache: CacheService,
}

impl Invalidator {
    pub fn new(cache: CacheService) -> Self {
        Self { cache }
    }

    /// Deletes one target. Returns how many keys went away; an exact key that
    /// was not cached counts as 0.
    pub async fn invalidate(&self, target: &InvalidationTarget) -> u64 {
        match target {
            InvalidationTarget::Key(key) => self.cache.remove(key).await,
            InvalidationTarget::Pattern(pattern) => self.cache.del_pattern(pattern).await,
        }
    }

    /// Drops everything `mutation` made stale. Returns the number of keys removed.
    pub async fn apply(&self, mutation: &Mutation) -> u64 {
        let mut removed = 0;
        for target in mutation.targets() {
            removed += self.invalidate(&target).await;
        }
        debug!(?mutation, removed, "Applied cache invalidation");
        removed
    }
}
