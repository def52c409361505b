//! Lead and activity manager (CRM)
//!
//! Leads are keyed `lead/{id}`, activities `activity/{id}`. Activity
//! creation stamps the parent lead's `last_contacted_at` for contact-type
//! activities; that is two store writes, not a transaction, matching the
//! source system's behavior. CSV import de-duplicates by lowercased email
//! against the store and within the batch, returning only the newly
//! created leads.

use std::collections::HashSet;
use std::sync::Arc;

use caseflow_model::lead::normalize_email;
use caseflow_model::{
    Activity, ActivityId, ActivityType, Lead, LeadId, LeadSource, LeadStatus, OrderId,
};
use caseflow_store::{Collection, KvStore};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::csv::LeadCsvRow;
use crate::error::CoreError;
use crate::rand_suffix;

const CREATE_ID_ATTEMPTS: u32 = 8;

/// Input for [`LeadManager::create_lead`].
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub name: String,
    pub company: String,
    pub email: String,
    pub website: Option<String>,
    pub selection_reason: Option<String>,
    pub source: Option<LeadSource>,
    pub tags: Vec<String>,
    pub assigned_to: Option<String>,
    pub estimated_value: Option<f64>,
    pub linked_order_id: Option<OrderId>,
}

/// Shallow-merge patch for [`LeadManager::update_lead`].
#[derive(Debug, Clone, Default)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub selection_reason: Option<String>,
    pub status: Option<LeadStatus>,
    pub tags: Option<Vec<String>>,
    pub assigned_to: Option<String>,
    pub estimated_value: Option<f64>,
    pub linked_order_id: Option<OrderId>,
}

/// Input for [`LeadManager::create_activity`].
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub lead_id: LeadId,
    pub activity_type: ActivityType,
    pub subject: String,
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub email_sent: bool,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub created_by: Option<String>,
}

/// Shallow-merge patch for [`LeadManager::update_activity`].
/// `created_at` is immutable by design.
#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub subject: Option<String>,
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub email_sent: Option<bool>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
}

/// Listing filters for the leads API.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    /// Case-insensitive substring over name, company and email.
    pub search: Option<String>,
}

/// Aggregate pipeline counts.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmStats {
    pub total_leads: usize,
    pub new_leads: usize,
    pub contacted_leads: usize,
    pub qualified_leads: usize,
    pub customers: usize,
    pub lost_leads: usize,
    /// customers / total * 100, rounded to 2 decimals; 0 on an empty set.
    pub conversion_rate: f64,
    /// Mean `estimated_value` over customer-status leads that carry one.
    pub average_deal_value: f64,
}

/// CRUD, import and statistics over leads and their activities
#[derive(Debug, Clone)]
pub struct LeadManager {
    leads: Collection<Lead>,
    activities: Collection<Activity>,
}

impl LeadManager {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            leads: Collection::new(Arc::clone(&store), "lead"),
            activities: Collection::new(store, "activity"),
        }
    }

    /// Create a lead in `new` status.
    pub async fn create_lead(&self, input: NewLead) -> Result<Lead, CoreError> {
        let email = input.email.trim();
        if !email.contains('@') || email.len() < 3 {
            return Err(CoreError::Validation("email is not valid".into()));
        }
        if input.name.trim().is_empty() && input.company.trim().is_empty() {
            return Err(CoreError::Validation(
                "lead needs a name or a company".into(),
            ));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();
            let id = LeadId::from_parts(now, rand_suffix());
            let lead = Lead {
                id: id.clone(),
                name: input.name.trim().to_string(),
                company: input.company.trim().to_string(),
                email: email.to_string(),
                website: input.website.clone(),
                selection_reason: input.selection_reason.clone(),
                status: LeadStatus::New,
                source: input.source.unwrap_or(LeadSource::Manual),
                tags: input.tags.clone(),
                assigned_to: input.assigned_to.clone(),
                estimated_value: input.estimated_value,
                imported_from: None,
                linked_order_id: input.linked_order_id.clone(),
                last_contacted_at: None,
                created_at: now,
                updated_at: now,
            };
            match self.leads.put_new(id.as_str(), &lead).await {
                Ok(()) => {
                    info!(lead_id = %id, "lead created");
                    return Ok(lead);
                }
                Err(e) if e.is_conflict() && attempt < CREATE_ID_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>, CoreError> {
        Ok(self.leads.get(id.as_str()).await?)
    }

    /// Shallow-merge `patch` and stamp `updated_at`. `Ok(None)` when the
    /// lead does not exist.
    pub async fn update_lead(
        &self,
        id: &LeadId,
        patch: LeadPatch,
    ) -> Result<Option<Lead>, CoreError> {
        let now = Utc::now();
        let updated = self
            .leads
            .update(id.as_str(), |lead| {
                if let Some(v) = &patch.name {
                    lead.name = v.clone();
                }
                if let Some(v) = &patch.company {
                    lead.company = v.clone();
                }
                if let Some(v) = &patch.email {
                    lead.email = v.clone();
                }
                if let Some(v) = &patch.website {
                    lead.website = Some(v.clone());
                }
                if let Some(v) = &patch.selection_reason {
                    lead.selection_reason = Some(v.clone());
                }
                if let Some(v) = patch.status {
                    lead.status = v;
                }
                if let Some(v) = &patch.tags {
                    lead.tags = v.clone();
                }
                if let Some(v) = &patch.assigned_to {
                    lead.assigned_to = Some(v.clone());
                }
                if let Some(v) = patch.estimated_value {
                    lead.estimated_value = Some(v);
                }
                if let Some(v) = &patch.linked_order_id {
                    lead.linked_order_id = Some(v.clone());
                }
                lead.updated_at = now;
            })
            .await?;
        Ok(updated)
    }

    /// Delete a lead and every activity that references it.
    pub async fn delete_lead(&self, id: &LeadId) -> Result<bool, CoreError> {
        let existed = self.leads.delete(id.as_str()).await?;
        if !existed {
            return Ok(false);
        }
        for activity in self.activities_for_lead(id).await? {
            self.activities.delete(activity.id.as_str()).await?;
        }
        info!(lead_id = %id, "lead deleted with activities");
        Ok(true)
    }

    /// Leads matching `filter`, newest first.
    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, CoreError> {
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut leads: Vec<Lead> = self
            .leads
            .list()
            .await?
            .into_iter()
            .filter(|lead| {
                filter.status.map_or(true, |s| lead.status == s)
                    && filter.source.map_or(true, |s| lead.source == s)
                    && needle.as_ref().map_or(true, |n| {
                        lead.name.to_lowercase().contains(n)
                            || lead.company.to_lowercase().contains(n)
                            || lead.email.to_lowercase().contains(n)
                    })
            })
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    /// Import parsed CSV rows, skipping any email already present (in the
    /// store or earlier in the batch). Returns only the created leads; the
    /// caller derives skip counts.
    pub async fn import_csv(
        &self,
        rows: Vec<LeadCsvRow>,
        source_label: &str,
    ) -> Result<Vec<Lead>, CoreError> {
        let mut seen: HashSet<String> = self
            .leads
            .list()
            .await?
            .iter()
            .map(Lead::email_key)
            .collect();

        let mut created = Vec::new();
        for row in rows {
            let key = normalize_email(&row.email);
            if !seen.insert(key) {
                debug!(email = %row.email, "duplicate email skipped on import");
                continue;
            }

            let mut attempt = 0;
            let lead = loop {
                attempt += 1;
                let now = Utc::now();
                let id = LeadId::from_parts(now, rand_suffix());
                let lead = Lead {
                    id: id.clone(),
                    name: row.name.clone(),
                    company: row.company.clone(),
                    email: row.email.trim().to_string(),
                    website: row.website.clone(),
                    selection_reason: row.selection_reason.clone(),
                    status: LeadStatus::New,
                    source: LeadSource::CsvImport,
                    tags: Vec::new(),
                    assigned_to: None,
                    estimated_value: None,
                    imported_from: Some(source_label.to_string()),
                    linked_order_id: None,
                    last_contacted_at: None,
                    created_at: now,
                    updated_at: now,
                };
                match self.leads.put_new(id.as_str(), &lead).await {
                    Ok(()) => break lead,
                    Err(e) if e.is_conflict() && attempt < CREATE_ID_ATTEMPTS => continue,
                    Err(e) => return Err(e.into()),
                }
            };
            created.push(lead);
        }
        info!(
            source = source_label,
            imported = created.len(),
            "csv import finished"
        );
        Ok(created)
    }

    /// Log an activity; contact-type activities stamp the parent lead's
    /// `last_contacted_at`.
    ///
    /// # Errors
    /// Not-found when the lead does not exist.
    pub async fn create_activity(&self, input: NewActivity) -> Result<Activity, CoreError> {
        if self.leads.get(input.lead_id.as_str()).await?.is_none() {
            return Err(CoreError::not_found("lead", input.lead_id.as_str()));
        }
        if input.subject.trim().is_empty() {
            return Err(CoreError::Validation("subject is required".into()));
        }

        let mut attempt = 0;
        let activity = loop {
            attempt += 1;
            let now = Utc::now();
            let id = ActivityId::from_parts(now, rand_suffix());
            let activity = Activity {
                id: id.clone(),
                lead_id: input.lead_id.clone(),
                activity_type: input.activity_type,
                subject: input.subject.trim().to_string(),
                notes: input.notes.clone(),
                outcome: input.outcome.clone(),
                follow_up_date: input.follow_up_date,
                email_sent: input.email_sent,
                email_subject: input.email_subject.clone(),
                email_body: input.email_body.clone(),
                created_by: input.created_by.clone(),
                created_at: now,
            };
            match self.activities.put_new(id.as_str(), &activity).await {
                Ok(()) => break activity,
                Err(e) if e.is_conflict() && attempt < CREATE_ID_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if input.activity_type.is_contact() {
            // Second, separate write; a crash in between leaves the
            // activity logged but the lead unstamped.
            let stamped_at = activity.created_at;
            self.leads
                .update(input.lead_id.as_str(), |lead| {
                    lead.last_contacted_at = Some(stamped_at);
                    lead.updated_at = stamped_at;
                })
                .await?;
        }
        Ok(activity)
    }

    pub async fn get_activity(&self, id: &ActivityId) -> Result<Option<Activity>, CoreError> {
        Ok(self.activities.get(id.as_str()).await?)
    }

    /// Shallow-merge `patch`. `Ok(None)` when the activity does not exist.
    pub async fn update_activity(
        &self,
        id: &ActivityId,
        patch: ActivityPatch,
    ) -> Result<Option<Activity>, CoreError> {
        let updated = self
            .activities
            .update(id.as_str(), |activity| {
                if let Some(v) = &patch.subject {
                    activity.subject = v.clone();
                }
                if let Some(v) = &patch.notes {
                    activity.notes = Some(v.clone());
                }
                if let Some(v) = &patch.outcome {
                    activity.outcome = Some(v.clone());
                }
                if let Some(v) = patch.follow_up_date {
                    activity.follow_up_date = Some(v);
                }
                if let Some(v) = patch.email_sent {
                    activity.email_sent = v;
                }
                if let Some(v) = &patch.email_subject {
                    activity.email_subject = Some(v.clone());
                }
                if let Some(v) = &patch.email_body {
                    activity.email_body = Some(v.clone());
                }
            })
            .await?;
        Ok(updated)
    }

    pub async fn delete_activity(&self, id: &ActivityId) -> Result<bool, CoreError> {
        Ok(self.activities.delete(id.as_str()).await?)
    }

    /// Activities for one lead, oldest first.
    pub async fn activities_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<Activity>, CoreError> {
        let mut activities: Vec<Activity> = self
            .activities
            .list()
            .await?
            .into_iter()
            .filter(|a| a.lead_id == *lead_id)
            .collect();
        activities.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(activities)
    }

    /// Every recorded activity, oldest first.
    pub async fn all_activities(&self) -> Result<Vec<Activity>, CoreError> {
        let mut activities = self.activities.list().await?;
        activities.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(activities)
    }

    /// Aggregate pipeline statistics.
    pub async fn crm_stats(&self) -> Result<CrmStats, CoreError> {
        let leads = self.leads.list().await?;
        let count = |status: LeadStatus| leads.iter().filter(|l| l.status == status).count();

        let total_leads = leads.len();
        let customers = count(LeadStatus::Customer);
        let conversion_rate = if total_leads == 0 {
            0.0
        } else {
            round2(customers as f64 / total_leads as f64 * 100.0)
        };
        let deal_values: Vec<f64> = leads
            .iter()
            .filter(|l| l.status == LeadStatus::Customer)
            .filter_map(|l| l.estimated_value)
            .collect();
        let average_deal_value = if deal_values.is_empty() {
            0.0
        } else {
            round2(deal_values.iter().sum::<f64>() / deal_values.len() as f64)
        };

        Ok(CrmStats {
            total_leads,
            new_leads: count(LeadStatus::New),
            contacted_leads: count(LeadStatus::Contacted),
            qualified_leads: count(LeadStatus::Qualified),
            customers,
            lost_leads: count(LeadStatus::Lost),
            conversion_rate,
            average_deal_value,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
