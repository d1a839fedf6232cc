//! Per-request identity.
//!
//! A `RequestContext` is created once at the request boundary and passed by
//! reference through every stage; nothing reads correlation state globally.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies every event emitted while serving one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an id received from outside (e.g. a HITL decision path).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request surface operation, used for rate-limit scoping and audit tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CheckSuitability,
    GetMarketData,
    SubmitHitlDecision,
}

impl ToolName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckSuitability => "check_suitability",
            Self::GetMarketData => "get_market_data",
            Self::SubmitHitlDecision => "submit_hitl_decision",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session used when the caller supplies none.
pub const DEFAULT_SESSION_ID: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub correlation_id: CorrelationId,
    pub session_id: String,
    pub tool_name: ToolName,
}

impl RequestContext {
    /// New context with a fresh correlation id.
    pub fn new(session_id: Option<&str>, tool_name: ToolName) -> Self {
        let session_id = session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
            .to_string();
        Self {
            correlation_id: CorrelationId::generate(),
            session_id,
            tool_name,
        }
    }

    /// Context for resuming work that already has a correlation id.
    pub fn resumed(correlation_id: CorrelationId, session_id: String, tool_name: ToolName) -> Self {
        Self {
            correlation_id,
            session_id,
            tool_name,
        }
    }
}
