//! Lead and activity records for the sales CRM
//!
//! Leads are identified by `LEAD-{millis}-{NNN}` ids and deduplicated on
//! import by lowercased email. Activities are owned by exactly one lead and
//! are cascade-deleted with it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::order::OrderId;

/// Lead identifier, `LEAD-{millis}-{NNN}`. Not collision-proof.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    #[must_use]
    pub fn from_parts(at: DateTime<Utc>, suffix: u16) -> Self {
        Self(format!("LEAD-{}-{}", at.timestamp_millis(), suffix % 1000))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Activity identifier, `ACT-{millis}-{NNN}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub String);

impl ActivityId {
    #[must_use]
    pub fn from_parts(at: DateTime<Utc>, suffix: u16) -> Self {
        Self(format!("ACT-{}-{}", at.timestamp_millis(), suffix % 1000))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActivityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// CRM pipeline stage of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Nurturing,
    Customer,
    Lost,
}

impl LeadStatus {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "contacted" => Some(Self::Contacted),
            "qualified" => Some(Self::Qualified),
            "nurturing" => Some(Self::Nurturing),
            "customer" => Some(Self::Customer),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }
}

/// Where a lead record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Manual,
    CsvImport,
    Website,
    Referral,
    Other,
}

impl LeadSource {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "csv_import" => Some(Self::CsvImport),
            "website" => Some(Self::Website),
            "referral" => Some(Self::Referral),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A prospective customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub company: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_reason: Option<String>,
    pub status: LeadStatus,
    pub source: LeadSource,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Import/dedup identity key: lowercased, trimmed email.
    #[must_use]
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }
}

/// Lowercase + trim, the identity normalization used on CSV import.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Kind of CRM interaction logged against a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Email,
    Call,
    Meeting,
    Demo,
    Note,
}

impl ActivityType {
    /// Whether logging this activity counts as contacting the lead
    /// (stamps the lead's `last_contacted_at`).
    #[inline]
    #[must_use]
    pub fn is_contact(self) -> bool {
        !matches!(self, Self::Note)
    }
}

/// A timestamped interaction log entry attached to a lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub lead_id: LeadId,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub email_sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}
