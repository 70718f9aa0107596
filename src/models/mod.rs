//! Data transfer objects
//!
//! `resources` holds the typed payloads cached by the business layer;
//! `requests` and `responses` are the bodies of the operational HTTP API.

pub mod requests;
pub mod resources;
pub mod responses;

// Re-export commonly used types
pub use requests::InvalidateRequest;
pub use resources::{
    DashboardStats, InspectionStatus, InspectionSummary, InvoiceStatus, InvoiceSummary, Page,
    PropertySummary, TicketPriority, TicketStatus, TicketSummary,
};
pub use responses::{HealthResponse, InvalidateResponse, StatsResponse};
