//! Order record and the order status state machine
//!
//! An order progresses `pending_payment -> code_generated -> pdf_uploaded ->
//! completed`, forward only. Status updates go through
//! [`validate_transition`]; free-form field merges do not re-validate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order identifier in `{YYYYMMDD}-{HHMM}-{NNN}` form.
///
/// Generated from the creation timestamp plus a random three-digit suffix.
/// Collision-improbable under normal usage; there is no uniqueness scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Build an id from a timestamp and a 0..=999 random suffix.
    #[must_use]
    pub fn from_parts(at: DateTime<Utc>, suffix: u16) -> Self {
        Self(format!(
            "{}-{:03}",
            at.format("%Y%m%d-%H%M"),
            suffix % 1000
        ))
    }

    /// Check the `\d{8}-\d{4}-\d{3}` shape without a regex engine.
    #[must_use]
    pub fn is_well_formed(s: &str) -> bool {
        let bytes = s.as_bytes();
        if bytes.len() != 17 {
            return false;
        }
        bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    CodeGenerated,
    PdfUploaded,
    Completed,
}

impl OrderStatus {
    /// Stable wire name, matching the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::CodeGenerated => "code_generated",
            Self::PdfUploaded => "pdf_uploaded",
            Self::Completed => "completed",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(Self::PendingPayment),
            "code_generated" => Some(Self::CodeGenerated),
            "pdf_uploaded" => Some(Self::PdfUploaded),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Illegal order status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal order status transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

pub fn allowed_transitions(from: OrderStatus) -> Vec<OrderStatus> {
    use OrderStatus::*;
    match from {
        PendingPayment => vec![CodeGenerated],
        CodeGenerated => vec![PdfUploaded],
        PdfUploaded => vec![Completed],
        Completed => vec![],
    }
}

/// Validates a status transition. Forward-only; terminal states have no
/// outgoing edges.
pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), TransitionError> {
    if allowed_transitions(from).into_iter().any(|s| s == to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// A customer's purchase record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub template_type: String,
    pub email: String,
    pub company_name: String,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub confirmation_code: Option<String>,
    pub pdf_uploaded: bool,
    pub html_generated: bool,
}

impl Order {
    /// New order in the initial `pending_payment` state.
    #[must_use]
    pub fn new(
        order_id: OrderId,
        template_type: impl Into<String>,
        email: impl Into<String>,
        company_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            template_type: template_type.into(),
            email: email.into(),
            company_name: company_name.into(),
            created_at,
            status: OrderStatus::PendingPayment,
            confirmation_code: None,
            pdf_uploaded: false,
            html_generated: false,
        }
    }

    /// Advance to `to`, validating the transition.
    pub fn advance(&mut self, to: OrderStatus) -> Result<(), TransitionError> {
        validate_transition(self.status, to)?;
        self.status = to;
        Ok(())
    }
}
