//! Cached resource DTOs
//!
//! Typed shapes of the list and detail views the business layer caches.
//! Changing any of them means bumping `CACHE_SCHEMA_VERSION`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::PageSlice;

// == Page ==
/// One page of a paginated list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, slice: PageSlice, total: u64) -> Self {
        Self {
            items,
            page: slice.page,
            limit: slice.limit,
            total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// == Properties ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub id: String,
    pub name: String,
    pub address: String,
    pub agent_id: Option<String>,
    pub unit_count: u32,
    pub occupied_units: u32,
}

// == Tickets ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: String,
    pub property_id: String,
    pub tenant_id: String,
    pub title: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
}

// == Invoices ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: String,
    pub property_id: String,
    pub tenant_id: String,
    /// Minor currency units
    pub amount_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
}

// == Inspections ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionSummary {
    pub id: String,
    pub property_id: String,
    pub inspector_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: InspectionStatus,
}

// == Dashboard ==
/// Per-user aggregate counts shown on the landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub properties: u64,
    pub open_tickets: u64,
    pub pending_invoices: u64,
    pub overdue_invoices: u64,
    pub upcoming_inspections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TicketStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(serde_json::to_string(&InvoiceStatus::Paid).unwrap(), "\"PAID\"");
    }

    #[test]
    fn test_page_from_slice() {
        let page = Page::new(vec!["a", "b"], PageSlice::new(3, 2), 10);
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 2);
        assert_eq!(page.total, 10);
        assert!(!page.is_empty());
    }

    #[test]
    fn test_invoice_deserialize() {
        let json = r#"{
            "id": "inv-1",
            "property_id": "p-1",
            "tenant_id": "t-1",
            "amount_cents": 125000,
            "currency": "USD",
            "status": "OVERDUE",
            "due_date": "2026-10-01",
            "paid_at": null
        }"#;
        let invoice: InvoiceSummary = serde_json::from_str(json).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Overdue);
        assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert!(invoice.paid_at.is_none());
    }
}
