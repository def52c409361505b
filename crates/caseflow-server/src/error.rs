//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use caseflow_core::{CoreError, ErrorClass};
use caseflow_mail::MailError;
use serde::Serialize;
use tracing::error;

/// Wire shape for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

/// Boundary error; everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("mail delivery failed: {0}")]
    Mail(#[from] MailError),

    /// Request shape problems the core never sees.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Core(e) => match e.class() {
                ErrorClass::Validation | ErrorClass::Conflict => StatusCode::BAD_REQUEST,
                ErrorClass::NotFound => StatusCode::NOT_FOUND,
                ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Mail(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Core(e) => e.kind(),
            Self::Mail(_) => "mail",
            Self::BadRequest(_) => "validation",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal detail goes to the log, not the wire.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(detail = %self, "internal error");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: message,
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_model::OrderId;

    #[test]
    fn status_mapping_follows_error_class() {
        let not_found = ApiError::Core(CoreError::NotFound {
            kind: "order",
            id: "x".into(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict =
            ApiError::Core(CoreError::AlreadyActivated(OrderId("20250101-0900-001".into())));
        assert_eq!(conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(conflict.kind(), "already_activated");

        let bad = ApiError::bad_request("leadId is required");
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.kind(), "validation");
    }
}
