//! HTTP adapter for the caseflow back-office
//!
//! Thin axum layer over the [`Backoffice`] facade: JSON in, JSON out, with
//! the error classification from `caseflow-core` mapped onto status codes.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use caseflow_core::Backoffice;
use caseflow_mail::SmtpClient;

pub mod config;
pub mod error;
pub mod routes;

pub use config::Config;
pub use error::ApiError;

/// Shared handler state.
pub struct AppState {
    pub backoffice: Backoffice,
    /// Absent when no SMTP relay is configured; mail endpoints then 400.
    pub mailer: Option<SmtpClient>,
    pub mail_from: String,
    pub import_dir: PathBuf,
    pub mail_template_dir: PathBuf,
}

/// Build the full API router.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/api/create-order", post(routes::orders::create_order))
        .route(
            "/api/admin/activate-order",
            post(routes::orders::activate_order),
        )
        .route("/api/verify-code", post(routes::orders::verify_code))
        .route(
            "/api/crm/leads",
            get(routes::crm::list_leads)
                .post(routes::crm::create_lead)
                .put(routes::crm::update_lead)
                .delete(routes::crm::delete_lead),
        )
        .route(
            "/api/crm/activities",
            get(routes::crm::list_activities)
                .post(routes::crm::create_activity)
                .put(routes::crm::update_activity)
                .delete(routes::crm::delete_activity),
        )
        .route("/api/crm/import", post(routes::crm::import_csv))
        .route("/api/crm/send-email", post(routes::mail::send_email))
        .route(
            "/api/populate-template",
            post(routes::documents::populate_template),
        )
        .route("/api/download", post(routes::documents::download))
        .with_state(state)
}
