//! Human-in-the-loop approval.
//!
//! An approval starts `Pending` and moves to `Approved` or `Denied` exactly
//! once. Production requests go to [`ManualApprovalQueue`], which never
//! decides on its own; decisions arrive later through the gateway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::HitlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HitlStatus {
    Pending,
    Approved,
    Denied,
}

impl HitlStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitlDecision {
    pub approved: bool,
    pub approver: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl HitlDecision {
    pub fn approve(approver: impl Into<String>) -> Self {
        Self {
            approved: true,
            approver: approver.into(),
            note: None,
        }
    }

    pub fn deny(approver: impl Into<String>) -> Self {
        Self {
            approved: false,
            approver: approver.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitlApproval {
    pub status: HitlStatus,
    pub approver: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl HitlApproval {
    pub fn pending(requested_at: DateTime<Utc>) -> Self {
        Self {
            status: HitlStatus::Pending,
            approver: None,
            requested_at,
            decided_at: None,
            note: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == HitlStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == HitlStatus::Approved
    }

    /// Apply a decision. Fails if already decided or the approver is blank.
    pub fn resolve(&mut self, decision: &HitlDecision, at: DateTime<Utc>) -> Result<(), HitlError> {
        if !self.is_pending() {
            return Err(HitlError::AlreadyResolved(self.status));
        }
        let approver = decision.approver.trim();
        if approver.is_empty() {
            return Err(HitlError::MissingApprover);
        }
        self.status = if decision.approved {
            HitlStatus::Approved
        } else {
            HitlStatus::Denied
        };
        self.approver = Some(approver.to_string());
        self.decided_at = Some(at);
        self.note = decision.note.clone();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub correlation_id: String,
    pub session_id: String,
    pub ticker: String,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
}

/// Decides, or defers, a human approval.
#[async_trait]
pub trait ApprovalAuthority: Send + Sync {
    fn name(&self) -> &'static str;

    async fn request_approval(&self, request: &ApprovalRequest) -> HitlApproval;

    /// Called once a deferred request has been decided.
    fn decided(&self, _correlation_id: &str) {}
}

/// Leaves every request pending and remembers it until decided.
#[derive(Debug, Default)]
pub struct ManualApprovalQueue {
    outstanding: DashMap<String, ApprovalRequest>,
}

impl ManualApprovalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outstanding(&self) -> Vec<ApprovalRequest> {
        let mut requests: Vec<_> = self.outstanding.iter().map(|e| e.value().clone()).collect();
        requests.sort_by_key(|r| r.requested_at);
        requests
    }

    /// Drop a request once it has been decided.
    pub fn forget(&self, correlation_id: &str) -> bool {
        self.outstanding.remove(correlation_id).is_some()
    }
}

#[async_trait]
impl ApprovalAuthority for ManualApprovalQueue {
    fn name(&self) -> &'static str {
        "manual_queue"
    }

    async fn request_approval(&self, request: &ApprovalRequest) -> HitlApproval {
        info!(
            correlation_id = %request.correlation_id,
            ticker = %request.ticker,
            "Queued for manual approval"
        );
        self.outstanding
            .insert(request.correlation_id.clone(), request.clone());
        HitlApproval::pending(request.requested_at)
    }

    fn decided(&self, correlation_id: &str) {
        self.forget(correlation_id);
    }
}

/// Resolves immediately with a fixed answer. Test double.
#[derive(Debug, Clone)]
pub struct StaticApprover {
    approve: bool,
    approver: String,
}

impl StaticApprover {
    pub const DEFAULT_APPROVER: &'static str = "admin@company.com";

    pub fn approving() -> Self {
        Self {
            approve: true,
            approver: Self::DEFAULT_APPROVER.to_string(),
        }
    }

    pub fn denying() -> Self {
        Self {
            approve: false,
            approver: Self::DEFAULT_APPROVER.to_string(),
        }
    }
}

#[async_trait]
impl ApprovalAuthority for StaticApprover {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn request_approval(&self, request: &ApprovalRequest) -> HitlApproval {
        let mut approval = HitlApproval::pending(request.requested_at);
        let decision = HitlDecision {
            approved: self.approve,
            approver: self.approver.clone(),
            note: Some("Automatic decision".to_string()),
        };
        // A fresh pending approval with a non-blank approver always resolves.
        let _ = approval.resolve(&decision, request.requested_at);
        approval
    }
}
