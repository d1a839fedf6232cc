//! JSON responses returned by the gateway.
//!
//! Every variant serializes to an object carrying `error` and `error_code`.

use chrono::{DateTime, Utc};
use finintel_compliance::ComplianceVerdict;
use finintel_core::NormalizedRecord;
use finintel_store::{CacheStats, CheckpointRecord};
use serde::Serialize;

pub const STATUS_PENDING_APPROVAL: &str = "PENDING_APPROVAL";
pub const CODE_HITL_PENDING: &str = "HITL_PENDING";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub error_code: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub message: String,
    pub detail: String,
    pub troubleshooting: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ComplianceVerdict>,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuitabilityResponse {
    pub error: bool,
    pub error_code: Option<String>,
    pub correlation_id: String,
    #[serde(flatten)]
    pub verdict: ComplianceVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketDataResponse {
    pub error: bool,
    pub error_code: Option<String>,
    pub correlation_id: String,
    pub cache_hit: bool,
    #[serde(flatten)]
    pub record: NormalizedRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingResponse {
    pub error: bool,
    pub error_code: String,
    pub status: String,
    pub correlation_id: String,
    pub ticker: String,
    pub message: String,
}

impl PendingResponse {
    pub fn new(correlation_id: &str, ticker: &str) -> Self {
        Self {
            error: false,
            error_code: CODE_HITL_PENDING.to_string(),
            status: STATUS_PENDING_APPROVAL.to_string(),
            correlation_id: correlation_id.to_string(),
            ticker: ticker.to_string(),
            message: format!("{ticker} requires human approval before data is released"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    pub correlation_id: String,
    pub session_id: String,
    pub ticker: String,
    pub requested_at_ms: i64,
}

impl From<CheckpointRecord> for PendingApproval {
    fn from(record: CheckpointRecord) -> Self {
        Self {
            correlation_id: record.correlation_id,
            session_id: record.session_id,
            ticker: record.ticker,
            requested_at_ms: record.created_at_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingListResponse {
    pub error: bool,
    pub error_code: Option<String>,
    pub pending: Vec<PendingApproval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatsResponse {
    pub error: bool,
    pub error_code: Option<String>,
    #[serde(flatten)]
    pub stats: CacheStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GatewayResponse {
    Error(ErrorResponse),
    Suitability(Box<SuitabilityResponse>),
    MarketData(Box<MarketDataResponse>),
    Pending(PendingResponse),
    PendingList(PendingListResponse),
    CacheStats(CacheStatsResponse),
}

impl GatewayResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Error(e) => Some(&e.error_code),
            Self::Pending(p) => Some(&p.error_code),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "error": true,
                "error_code": "INTERNAL_ERROR",
                "message": format!("response serialization failed: {e}"),
            })
        })
    }
}
