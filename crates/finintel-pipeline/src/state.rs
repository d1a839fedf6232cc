//! Serializable pipeline state.
//!
//! A suspended run is persisted as this JSON and restored on resume, so
//! every field must round-trip through serde.

use chrono::{DateTime, Utc};
use finintel_compliance::{ComplianceVerdict, HitlApproval, WatchlistDecision};
use finintel_core::{truncate_for_log, NormalizedRecord, RequestContext, TickerSymbol, ToolName};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Validate,
    Compliance,
    Watchlist,
    HitlPause,
    HitlResolve,
    Retrieve,
    Success,
    Failed,
    ValidationFailed,
    ComplianceDenied,
    HitlDenied,
}

impl Node {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Compliance => "compliance",
            Self::Watchlist => "watchlist",
            Self::HitlPause => "hitl_pause",
            Self::HitlResolve => "hitl_resolve",
            Self::Retrieve => "retrieve",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::ValidationFailed => "validation_failed",
            Self::ComplianceDenied => "compliance_denied",
            Self::HitlDenied => "hitl_denied",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success
                | Self::Failed
                | Self::ValidationFailed
                | Self::ComplianceDenied
                | Self::HitlDenied
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailEntry {
    pub at: DateTime<Utc>,
    pub node: Node,
    pub actor: String,
    pub message: String,
}

/// Terminal failure carried in the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub code: String,
    pub message: String,
    pub detail: String,
    pub troubleshooting: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl From<&PipelineError> for Failure {
    fn from(err: &PipelineError) -> Self {
        let retry_after_seconds = match err {
            PipelineError::RateLimited { retry_after_seconds, .. } => Some(*retry_after_seconds),
            _ => None,
        };
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            detail: err.detail(),
            troubleshooting: err.troubleshooting(),
            retry_after_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub correlation_id: String,
    pub session_id: String,
    pub tool: ToolName,
    /// Caller input, truncated.
    pub input: String,
    pub node: Node,
    pub ticker: Option<TickerSymbol>,
    pub verdict: Option<ComplianceVerdict>,
    pub watchlist: Option<WatchlistDecision>,
    pub approval: Option<HitlApproval>,
    pub cache_hit: bool,
    pub record: Option<NormalizedRecord>,
    pub failure: Option<Failure>,
    pub trail: Vec<TrailEntry>,
}

impl PipelineState {
    pub fn new(ctx: &RequestContext, raw: &str) -> Self {
        Self {
            correlation_id: ctx.correlation_id.to_string(),
            session_id: ctx.session_id.clone(),
            tool: ctx.tool_name,
            input: truncate_for_log(raw),
            node: Node::Validate,
            ticker: None,
            verdict: None,
            watchlist: None,
            approval: None,
            cache_hit: false,
            record: None,
            failure: None,
            trail: Vec::new(),
        }
    }

    /// Move to `node`, appending a trail entry.
    pub fn advance(&mut self, node: Node, actor: &str, message: impl Into<String>, at: DateTime<Utc>) {
        self.node = node;
        self.trail.push(TrailEntry {
            at,
            node,
            actor: actor.to_string(),
            message: message.into(),
        });
    }

    /// Record `err` and move to the matching terminal node.
    pub fn fail(&mut self, err: &PipelineError, actor: &str, at: DateTime<Utc>) {
        let node = match err {
            PipelineError::Validation(_) => Node::ValidationFailed,
            PipelineError::ComplianceDenied { .. } => Node::ComplianceDenied,
            PipelineError::HitlDenied { .. } => Node::HitlDenied,
            _ => Node::Failed,
        };
        self.failure = Some(Failure::from(err));
        self.advance(node, actor, err.to_string(), at);
    }

    pub fn is_terminal(&self) -> bool {
        self.node.is_terminal()
    }

    pub fn visited(&self, node: Node) -> bool {
        self.trail.iter().any(|t| t.node == node)
    }
}
