//! Route handlers, grouped by surface

use axum::Json;
use serde_json::{json, Value};

pub mod crm;
pub mod documents;
pub mod mail;
pub mod orders;

use crate::ApiError;

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Reject names that could escape the configured directory.
pub(crate) fn safe_file_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
    {
        return Err(ApiError::bad_request(format!(
            "'{name}' is not a plain file name"
        )));
    }
    Ok(name)
}
