//! Domain types for the caseflow back-office
//!
//! Leaf crate shared by every other workspace member. Holds the order,
//! confirmation-code, lead and activity records together with the order
//! status state machine, and the `SafetyCaseData` payload consumed by the
//! template populator.

pub mod code;
pub mod lead;
pub mod order;
pub mod safety_case;

pub use code::ConfirmationCode;
pub use lead::{Activity, ActivityId, ActivityType, Lead, LeadId, LeadSource, LeadStatus};
pub use order::{Order, OrderId, OrderStatus, TransitionError};
pub use safety_case::{
    ComplianceStandard, RiskAssessment, SafetyCaseData, TestingResult,
};
