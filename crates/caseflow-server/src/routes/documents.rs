//! Template population and final document download

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use caseflow_model::{OrderId, SafetyCaseData};
use serde::{Deserialize, Serialize};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateRequest {
    pub order_id: OrderId,
    pub data: SafetyCaseData,
}

#[derive(Debug, Serialize)]
pub struct PopulateResponse {
    pub html: String,
}

pub async fn populate_template(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PopulateRequest>,
) -> Result<Json<PopulateResponse>, ApiError> {
    let html = state.backoffice.populate(&req.order_id, &req.data).await?;
    Ok(Json(PopulateResponse { html }))
}

/// Render the final document as a `text/html` attachment and complete
/// the order.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PopulateRequest>,
) -> Result<Response, ApiError> {
    let (order, html) = state.backoffice.download(&req.order_id, &req.data).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    let disposition = format!(
        "attachment; filename=\"safety-case-{}.html\"",
        order.order_id.as_str()
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|_| ApiError::bad_request("order id is not header-safe"))?,
    );
    Ok((headers, html).into_response())
}
