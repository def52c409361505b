//! Order lifecycle endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use caseflow_core::CoreError;
use caseflow_model::{Order, OrderId};
use serde::{Deserialize, Serialize};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub template_type: String,
    pub email: String,
    pub company_name: String,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .backoffice
        .orders()
        .create_order(&req.template_type, &req.email, &req.company_name)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateOrderRequest {
    pub order_id: OrderId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateOrderResponse {
    pub confirmation_code: String,
    pub order: Order,
}

pub async fn activate_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActivateOrderRequest>,
) -> Result<Json<ActivateOrderResponse>, ApiError> {
    let (order, code) = state.backoffice.activate_order(&req.order_id).await?;
    Ok(Json(ActivateOrderResponse {
        confirmation_code: code.code,
        order,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Redeem a confirmation code. Bad codes come back as `{valid: false}`
/// with a 400 rather than a bare error body, so the paywall client can
/// branch on one field.
pub async fn verify_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Response, ApiError> {
    match state.backoffice.redeem_code(req.code.trim()).await {
        Ok((order, _verified)) => Ok(Json(VerifyCodeResponse {
            valid: true,
            order_id: Some(order.order_id),
            error: None,
        })
        .into_response()),
        Err(e @ (CoreError::CodeUnknown(_) | CoreError::CodeUsed(_))) => Ok((
            StatusCode::BAD_REQUEST,
            Json(VerifyCodeResponse {
                valid: false,
                order_id: None,
                error: Some(e.to_string()),
            }),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}
