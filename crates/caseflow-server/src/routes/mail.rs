//! Outbound mail endpoint

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use caseflow_core::NewActivity;
use caseflow_mail::{render_mail_template, MailMessage};
use caseflow_model::{ActivityId, ActivityType, LeadId};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::safe_file_name;
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    /// Explicit recipient; falls back to the lead's address.
    pub to: Option<String>,
    pub subject: Option<String>,
    /// Literal body variant.
    pub message: Option<String>,
    /// Template variant, read from the mail template directory.
    pub template_name: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// When present, the send is logged as an `email` activity.
    pub lead_id: Option<LeadId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub sent: bool,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<ActivityId>,
}

struct MailContent {
    subject: String,
    body: String,
}

/// Resolve subject and body from the two request shapes.
///
/// The literal variant requires an explicit `subject`. The template
/// variant falls back to a `Subject:` header line in the template, then
/// a `subject` variable, then the template name itself, so the
/// `{templateName, variables}` body shape works on its own.
fn compose_mail(
    req: &SendEmailRequest,
    template: Option<(&str, &str)>,
) -> Result<MailContent, ApiError> {
    let explicit = req
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match (&req.message, template) {
        (Some(message), _) => Ok(MailContent {
            subject: explicit
                .ok_or_else(|| ApiError::bad_request("subject is required"))?
                .to_string(),
            body: message.clone(),
        }),
        (None, Some((name, text))) => {
            let (header, rest) = split_subject_header(text);
            let subject = explicit
                .map(str::to_string)
                .or_else(|| header.map(|h| render_mail_template(h, &req.variables)))
                .or_else(|| req.variables.get("subject").cloned())
                .unwrap_or_else(|| name.to_string());
            Ok(MailContent {
                subject,
                body: render_mail_template(rest, &req.variables),
            })
        }
        (None, None) => Err(ApiError::bad_request(
            "either message or templateName is required",
        )),
    }
}

/// Split a leading `Subject:` line off a mail template, along with one
/// blank separator line after it.
fn split_subject_header(text: &str) -> (Option<&str>, &str) {
    let (first, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (text, ""),
    };
    match first.trim_end().strip_prefix("Subject:") {
        Some(subject) => {
            let rest = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest);
            (Some(subject.trim()), rest)
        }
        None => (None, text),
    }
}

pub async fn send_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Some(mailer) = &state.mailer else {
        return Err(ApiError::bad_request("smtp is not configured"));
    };

    let template = match (&req.message, &req.template_name) {
        (None, Some(template_name)) => {
            let name = safe_file_name(template_name)?;
            let path = state.mail_template_dir.join(format!("{name}.txt"));
            let text = tokio::fs::read_to_string(&path).await.map_err(|_| {
                ApiError::bad_request(format!("unknown mail template '{name}'"))
            })?;
            Some((name.to_string(), text))
        }
        _ => None,
    };
    let MailContent { subject, body } = compose_mail(
        &req,
        template.as_ref().map(|(n, t)| (n.as_str(), t.as_str())),
    )?;

    let lead = match &req.lead_id {
        Some(lead_id) => Some(
            state
                .backoffice
                .leads()
                .get_lead(lead_id)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| {
                    ApiError::Core(caseflow_core::CoreError::NotFound {
                        kind: "lead",
                        id: lead_id.as_str().to_string(),
                    })
                })?,
        ),
        None => None,
    };

    let to = req
        .to
        .clone()
        .or_else(|| lead.as_ref().map(|l| l.email.clone()))
        .ok_or_else(|| ApiError::bad_request("either to or leadId is required"))?;

    mailer
        .send(MailMessage {
            from: state.mail_from.clone(),
            to: to.clone(),
            subject: subject.clone(),
            body: body.clone(),
        })
        .await?;

    // Sending and logging are not transactional; a failed log still means
    // the mail went out, so report the send and surface the log error.
    let activity_id = match lead {
        Some(lead) => {
            let activity = state
                .backoffice
                .leads()
                .create_activity(NewActivity {
                    lead_id: lead.id,
                    activity_type: ActivityType::Email,
                    subject: subject.clone(),
                    notes: None,
                    outcome: None,
                    follow_up_date: None,
                    email_sent: true,
                    email_subject: Some(subject.clone()),
                    email_body: Some(body),
                    created_by: None,
                })
                .await?;
            Some(activity.id)
        }
        None => None,
    };

    info!(to = %to, subject = %subject, "email dispatched");
    Ok(Json(SendEmailResponse {
        sent: true,
        to,
        activity_id,
    }))
}
