//! Compliance verdict types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Approved,
    Denied,
}

impl ComplianceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
        }
    }
}

/// Which layer produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceLevel {
    HardBlock,
    WatchlistHold,
    OwnershipReview,
    OwnershipDataUnavailable,
    OwnershipVerificationError,
    Cleared,
}

impl ComplianceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HardBlock => "HARD_BLOCK",
            Self::WatchlistHold => "WATCHLIST_HOLD",
            Self::OwnershipReview => "OWNERSHIP_REVIEW",
            Self::OwnershipDataUnavailable => "OWNERSHIP_DATA_UNAVAILABLE",
            Self::OwnershipVerificationError => "OWNERSHIP_VERIFICATION_ERROR",
            Self::Cleared => "CLEARED",
        }
    }
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Outcome of one compliance evaluation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub ticker: String,
    pub status: ComplianceStatus,
    pub level: ComplianceLevel,
    pub reason: String,
    pub risk_level: RiskLevel,
    pub evidence: Vec<String>,
    pub checks_performed: Vec<String>,
    pub next_steps: Vec<String>,
    pub requires_review: bool,
    pub escalation_required: bool,
    pub data_access_approved: bool,
    pub checked_at: DateTime<Utc>,
}

impl ComplianceVerdict {
    pub fn is_approved(&self) -> bool {
        self.status == ComplianceStatus::Approved
    }

    pub(crate) fn denied(
        ticker: &str,
        level: ComplianceLevel,
        risk_level: RiskLevel,
        reason: impl Into<String>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            status: ComplianceStatus::Denied,
            level,
            reason: reason.into(),
            risk_level,
            evidence: Vec::new(),
            checks_performed: Vec::new(),
            next_steps: Vec::new(),
            requires_review: true,
            escalation_required: false,
            data_access_approved: false,
            checked_at,
        }
    }

    pub(crate) fn cleared(ticker: &str, checked_at: DateTime<Utc>) -> Self {
        Self {
            ticker: ticker.to_string(),
            status: ComplianceStatus::Approved,
            level: ComplianceLevel::Cleared,
            reason: "All compliance checks passed".to_string(),
            risk_level: RiskLevel::Low,
            evidence: Vec::new(),
            checks_performed: Vec::new(),
            next_steps: Vec::new(),
            requires_review: false,
            escalation_required: false,
            data_access_approved: true,
            checked_at,
        }
    }

    pub(crate) fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    pub(crate) fn with_next_steps(mut self, steps: &[&str]) -> Self {
        self.next_steps = steps.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let verdict = ComplianceVerdict::denied(
            "RESTRICTED",
            ComplianceLevel::HardBlock,
            RiskLevel::Critical,
            "blocked",
            Utc::now(),
        );
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["status"], "DENIED");
        assert_eq!(json["level"], "HARD_BLOCK");
        assert_eq!(json["risk_level"], "CRITICAL");
        assert!(!verdict.is_approved());
    }

    #[test]
    fn test_cleared_grants_access() {
        let verdict = ComplianceVerdict::cleared("AAPL", Utc::now());
        assert!(verdict.is_approved());
        assert!(verdict.data_access_approved);
        assert_eq!(verdict.risk_level, RiskLevel::Low);
    }
}
