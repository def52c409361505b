//! Confirmation code record
//!
//! One-time-use `UNLOCK-NNN` tokens gating PDF upload for a paid order.
//! Numbers are globally monotonic across the store, not per-order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::OrderId;

/// Prefix shared by every issued code.
pub const CODE_PREFIX: &str = "UNLOCK-";

/// A one-time-use unlock token tied to a single order.
///
/// `used = true` is permanent; there is no reset path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationCode {
    pub code: String,
    pub order_id: OrderId,
    pub generated_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

impl ConfirmationCode {
    /// Fresh unused code for `order_id` with sequence number `seq`.
    #[must_use]
    pub fn new(seq: u64, order_id: OrderId, generated_at: DateTime<Utc>) -> Self {
        Self {
            code: format_code(seq),
            order_id,
            generated_at,
            used: false,
            used_at: None,
        }
    }

    /// Mark the code used at `at`. Re-marking an already-used code only
    /// rewrites `used_at`.
    pub fn mark_used(&mut self, at: DateTime<Utc>) {
        self.used = true;
        self.used_at = Some(at);
    }
}

/// `UNLOCK-NNN`, zero-padded to three digits (wider past 999).
#[must_use]
pub fn format_code(seq: u64) -> String {
    format!("{CODE_PREFIX}{seq:03}")
}
