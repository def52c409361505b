//! Lead and activity CRM endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use caseflow_core::{
    parse_lead_csv, ActivityPatch, CoreError, LeadFilter, LeadPatch, NewActivity, NewLead,
};
use caseflow_model::{
    Activity, ActivityId, ActivityType, Lead, LeadId, LeadSource, LeadStatus, OrderId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::safe_file_name;
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct LeadQuery {
    pub status: Option<String>,
    pub source: Option<String>,
    pub search: Option<String>,
    pub stats: Option<bool>,
}

impl LeadQuery {
    fn filter(&self) -> Result<LeadFilter, ApiError> {
        let status = self
            .status
            .as_deref()
            .map(|s| {
                LeadStatus::parse(s)
                    .ok_or_else(|| ApiError::bad_request(format!("unknown status '{s}'")))
            })
            .transpose()?;
        let source = self
            .source
            .as_deref()
            .map(|s| {
                LeadSource::parse(s)
                    .ok_or_else(|| ApiError::bad_request(format!("unknown source '{s}'")))
            })
            .transpose()?;
        Ok(LeadFilter {
            status,
            source,
            search: self.search.clone(),
        })
    }
}

/// `GET /api/crm/leads`. With `stats=true` the pipeline aggregate is
/// returned instead of the list.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadQuery>,
) -> Result<Response, ApiError> {
    let leads = state.backoffice.leads();
    if query.stats == Some(true) {
        return Ok(Json(leads.crm_stats().await?).into_response());
    }
    let filter = query.filter()?;
    Ok(Json(leads.list_leads(&filter).await?).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    pub email: String,
    pub website: Option<String>,
    pub selection_reason: Option<String>,
    pub source: Option<LeadSource>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub assigned_to: Option<String>,
    pub estimated_value: Option<f64>,
    pub linked_order_id: Option<OrderId>,
}

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let lead = state
        .backoffice
        .leads()
        .create_lead(NewLead {
            name: req.name,
            company: req.company,
            email: req.email,
            website: req.website,
            selection_reason: req.selection_reason,
            source: req.source,
            tags: req.tags,
            assigned_to: req.assigned_to,
            estimated_value: req.estimated_value,
            linked_order_id: req.linked_order_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadRequest {
    pub id: LeadId,
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

pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateLeadRequest>,
) -> Result<Json<Lead>, ApiError> {
    let patch = LeadPatch {
        name: req.name,
        company: req.company,
        email: req.email,
        website: req.website,
        selection_reason: req.selection_reason,
        status: req.status,
        tags: req.tags,
        assigned_to: req.assigned_to,
        estimated_value: req.estimated_value,
        linked_order_id: req.linked_order_id,
    };
    let updated = state
        .backoffice
        .leads()
        .update_lead(&req.id, patch)
        .await?
        .ok_or(CoreError::NotFound {
            kind: "lead",
            id: req.id.as_str().to_string(),
        })?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = LeadId(query.id);
    if !state.backoffice.leads().delete_lead(&id).await? {
        return Err(CoreError::NotFound {
            kind: "lead",
            id: id.as_str().to_string(),
        }
        .into());
    }
    Ok(Json(DeletedResponse { deleted: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    /// Filter down to one lead; every activity when absent.
    pub lead_id: Option<LeadId>,
}

pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let leads = state.backoffice.leads();
    let activities = match &query.lead_id {
        Some(lead_id) => leads.activities_for_lead(lead_id).await?,
        None => leads.all_activities().await?,
    };
    Ok(Json(activities))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    pub lead_id: LeadId,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub subject: String,
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub email_sent: bool,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub created_by: Option<String>,
}

pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateActivityRequest>,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    let activity = state
        .backoffice
        .leads()
        .create_activity(NewActivity {
            lead_id: req.lead_id,
            activity_type: req.activity_type,
            subject: req.subject,
            notes: req.notes,
            outcome: req.outcome,
            follow_up_date: req.follow_up_date,
            email_sent: req.email_sent,
            email_subject: req.email_subject,
            email_body: req.email_body,
            created_by: req.created_by,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivityRequest {
    pub id: ActivityId,
    pub subject: Option<String>,
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub email_sent: Option<bool>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
}

pub async fn update_activity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateActivityRequest>,
) -> Result<Json<Activity>, ApiError> {
    let patch = ActivityPatch {
        subject: req.subject,
        notes: req.notes,
        outcome: req.outcome,
        follow_up_date: req.follow_up_date,
        email_sent: req.email_sent,
        email_subject: req.email_subject,
        email_body: req.email_body,
    };
    let updated = state
        .backoffice
        .leads()
        .update_activity(&req.id, patch)
        .await?
        .ok_or(CoreError::NotFound {
            kind: "activity",
            id: req.id.as_str().to_string(),
        })?;
    Ok(Json(updated))
}

pub async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = ActivityId(query.id);
    if !state.backoffice.leads().delete_activity(&id).await? {
        return Err(CoreError::NotFound {
            kind: "activity",
            id: id.as_str().to_string(),
        }
        .into());
    }
    Ok(Json(DeletedResponse { deleted: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub csv_files: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFileReport {
    pub file: String,
    pub imported: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub results: Vec<ImportFileReport>,
}

/// Import leads from named CSV files in the configured import directory.
/// A bad file yields a per-file error entry; the batch keeps going.
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ApiError> {
    if req.csv_files.is_empty() {
        return Err(ApiError::bad_request("csvFiles must not be empty"));
    }

    let mut results = Vec::with_capacity(req.csv_files.len());
    for file in &req.csv_files {
        let name = match safe_file_name(file) {
            Ok(name) => name,
            Err(e) => {
                results.push(ImportFileReport {
                    file: file.clone(),
                    imported: 0,
                    skipped: 0,
                    error: Some(e.to_string()),
                });
                continue;
            }
        };
        let path = state.import_dir.join(name);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file = name, error = %e, "import file unreadable");
                results.push(ImportFileReport {
                    file: name.to_string(),
                    imported: 0,
                    skipped: 0,
                    error: Some(format!("cannot read '{name}': {e}")),
                });
                continue;
            }
        };

        let rows = parse_lead_csv(&text);
        let total = rows.len();
        let created = state.backoffice.leads().import_csv(rows, name).await?;
        results.push(ImportFileReport {
            file: name.to_string(),
            imported: created.len(),
            skipped: total - created.len(),
            error: None,
        });
    }
    Ok(Json(ImportResponse { results }))
}
