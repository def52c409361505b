//! Error types for the lifecycle managers
//!
//! Replaces the original system's free-text message matching with explicit
//! error kinds; the HTTP layer maps [`ErrorClass`] onto status codes.

use caseflow_model::order::TransitionError;
use caseflow_model::OrderId;
use caseflow_store::StoreError;
use caseflow_template::TemplateError;

/// Main core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A request field is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// The order already has a confirmation code.
    #[error("order '{0}' already has a confirmation code")]
    AlreadyActivated(OrderId),

    /// No such confirmation code was ever issued.
    #[error("confirmation code '{0}' is not recognized")]
    CodeUnknown(String),

    /// The confirmation code was already redeemed.
    #[error("confirmation code '{0}' has already been used")]
    CodeUsed(String),

    /// Attempted a backward or skipping order status change.
    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),

    /// Template loading or compilation failure.
    #[error("template failed: {0}")]
    Template(#[from] TemplateError),

    /// Persistence failure.
    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification used at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl CoreError {
    /// Classify for status mapping: validation -> 400, not-found -> 404,
    /// state conflicts -> 400 with a machine-readable kind, the rest -> 500.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Validation,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::AlreadyActivated(_)
            | Self::CodeUnknown(_)
            | Self::CodeUsed(_)
            | Self::IllegalTransition(_) => ErrorClass::Conflict,
            Self::Template(TemplateError::UnknownTemplateType { .. }) => ErrorClass::NotFound,
            Self::Template(_) | Self::Store(_) => ErrorClass::Internal,
        }
    }

    /// Stable machine-readable kind for API bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::AlreadyActivated(_) => "already_activated",
            Self::CodeUnknown(_) => "code_unknown",
            Self::CodeUsed(_) => "code_used",
            Self::IllegalTransition(_) => "illegal_transition",
            Self::Template(_) => "template",
            Self::Store(_) => "internal",
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
