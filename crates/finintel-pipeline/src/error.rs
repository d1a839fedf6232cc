//! Pipeline error types.

use finintel_compliance::{ComplianceVerdict, HitlError};
use finintel_core::ValidationError;
use finintel_provider::RetrievalError;
use finintel_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{}", .verdict.reason)]
    ComplianceDenied { verdict: Box<ComplianceVerdict> },

    #[error("Human reviewer denied access to {ticker}")]
    HitlDenied { ticker: String, approver: String },

    #[error("Rate limit exceeded: {count_in_window} calls in {window_secs} seconds")]
    RateLimited {
        count_in_window: u32,
        max_calls: u32,
        window_secs: u64,
        retry_after_seconds: u64,
    },

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("No pending approval for {0}")]
    NotFound(String),

    #[error(transparent)]
    Hitl(#[from] HitlError),

    #[error("A decision for {0} is already being applied")]
    DecisionInProgress(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::ComplianceDenied { .. } => "COMPLIANCE_DENIED",
            Self::HitlDenied { .. } => "HITL_DENIED",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::Retrieval(e) => e.code(),
            Self::NotFound(_) => "NOT_FOUND",
            Self::Hitl(HitlError::AlreadyResolved(_)) => "ALREADY_RESOLVED",
            Self::Hitl(HitlError::MissingApprover) => "VALIDATION_ERROR",
            Self::DecisionInProgress(_) => "DECISION_IN_PROGRESS",
            Self::Store(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::Validation(ValidationError::InjectionDetected { .. }) => {
                "Input rejected by security screening".to_string()
            }
            Self::Validation(_) => "Ticker must be 1-5 letters (A-Z)".to_string(),
            Self::ComplianceDenied { .. } => "Analysis prohibited by compliance policy".to_string(),
            Self::HitlDenied { .. } => "Manual review rejected this request".to_string(),
            Self::RateLimited { max_calls, window_secs, .. } => {
                format!("Maximum {max_calls} calls per {window_secs} seconds per session")
            }
            Self::Retrieval(RetrievalError::InsufficientData { reason }) => reason.clone(),
            Self::Retrieval(RetrievalError::UnknownError { detail })
            | Self::Retrieval(RetrievalError::NetworkError { detail }) => detail.clone(),
            Self::Retrieval(e) => e.to_string(),
            Self::NotFound(_) | Self::Hitl(_) | Self::DecisionInProgress(_) => self.to_string(),
            Self::Store(_) | Self::Internal(_) => "The request could not be completed".to_string(),
        }
    }

    pub fn troubleshooting(&self) -> String {
        match self {
            Self::Validation(_) => "Provide a valid ticker symbol such as AAPL.".to_string(),
            Self::ComplianceDenied { .. } => {
                "Contact Compliance team if you believe this is an error.".to_string()
            }
            Self::HitlDenied { .. } => "Contact your supervisor or compliance team.".to_string(),
            Self::RateLimited { retry_after_seconds, .. } => format!(
                "Wait {retry_after_seconds} seconds before retrying. Consider caching results or reducing request frequency."
            ),
            Self::Retrieval(e) => e.troubleshooting().to_string(),
            Self::NotFound(_) => "List pending approvals and use one of their correlation ids.".to_string(),
            Self::Hitl(_) => "Each approval can be decided once by a named approver.".to_string(),
            Self::DecisionInProgress(_) => {
                "Wait for the current decision to finish, then check the pending list.".to_string()
            }
            Self::Store(_) | Self::Internal(_) => "Retry later. Contact support if this persists.".to_string(),
        }
    }
}
