//! Compliance error types.

use thiserror::Error;

use crate::hitl::HitlStatus;

#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ComplianceResult<T> = Result<T, ComplianceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HitlError {
    #[error("Approval already resolved as {0:?}")]
    AlreadyResolved(HitlStatus),

    #[error("Approver identity is required")]
    MissingApprover,
}
