//! Service layer.
//!
//! Services sit between the HTTP handlers and the repositories. They own
//! the workflows that span several tables (login, sale registration,
//! payments) and the transactions around them.

pub mod auth_service;
pub mod report_service;
pub mod sale_service;

pub use auth_service::{AuthService, LoginOutcome};
pub use report_service::ReportService;
pub use sale_service::{PaymentReceipt, SaleService};
