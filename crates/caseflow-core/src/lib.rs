//! Order, confirmation-code and lead lifecycle managers
//!
//! The operational core of the back-office: order creation and status
//! advancement, one-time confirmation codes, lead/activity CRUD with CSV
//! import and CRM statistics, all persisted through the versioned
//! [`caseflow_store`] adapter. [`Backoffice`] composes the managers into
//! the operations the HTTP layer exposes.

pub mod backoffice;
pub mod codes;
pub mod csv;
pub mod error;
pub mod leads;
pub mod orders;

pub use backoffice::Backoffice;
pub use codes::{CodeIssuer, VerifiedCode};
pub use csv::{parse_lead_csv, LeadCsvRow};
pub use error::{CoreError, ErrorClass};
pub use leads::{
    ActivityPatch, CrmStats, LeadFilter, LeadManager, LeadPatch, NewActivity, NewLead,
};
pub use orders::{OrderManager, OrderPatch};

pub(crate) fn rand_suffix() -> u16 {
    use rand::Rng;
    rand::rng().random_range(0..1000)
}
