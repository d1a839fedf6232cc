//! Structured audit events and the sink they are written to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::RequestContext;
use crate::severity::Severity;

/// Compliance state attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceFlag {
    Approved,
    Denied,
    Pending,
    NotEvaluated,
}

impl ComplianceFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
            Self::Pending => "PENDING",
            Self::NotEvaluated => "NOT_EVALUATED",
        }
    }
}

/// One audit observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub correlation_id: String,
    pub session_id: String,
    pub tool_name: String,
    pub compliance_flag: ComplianceFlag,
    pub event_type: String,
    pub security_alert: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl AuditEvent {
    pub fn new(
        ctx: &RequestContext,
        severity: Severity,
        event_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            correlation_id: ctx.correlation_id.to_string(),
            session_id: ctx.session_id.clone(),
            tool_name: ctx.tool_name.as_str().to_string(),
            compliance_flag: ComplianceFlag::NotEvaluated,
            event_type: event_type.into(),
            security_alert: false,
            message: message.into(),
            context: Map::new(),
        }
    }

    pub fn with_flag(mut self, flag: ComplianceFlag) -> Self {
        self.compliance_flag = flag;
        self
    }

    pub fn security_alert(mut self) -> Self {
        self.security_alert = true;
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// Destination for audit events.
///
/// `emit_security` is used for denials and alerts in addition to `emit`.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: &AuditEvent);

    fn emit_security(&self, event: &AuditEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn emit(&self, _event: &AuditEvent) {}

    fn emit_security(&self, _event: &AuditEvent) {}
}

/// Captures events in memory for assertions.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
    security: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn security_events(&self) -> Vec<AuditEvent> {
        self.security.lock().clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }

    fn emit_security(&self, event: &AuditEvent) {
        self.security.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ToolName;

    #[test]
    fn test_event_carries_request_identity() {
        let ctx = RequestContext::new(Some("sess-1"), ToolName::GetMarketData);
        let event = AuditEvent::new(&ctx, Severity::Warning, "rate_limit_exceeded", "too many")
            .with_flag(ComplianceFlag::Approved)
            .security_alert()
            .with_field("retry_after_seconds", 12);

        assert_eq!(event.correlation_id, ctx.correlation_id.as_str());
        assert_eq!(event.tool_name, "get_market_data");
        assert!(event.security_alert);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["severity"], 4);
        assert_eq!(json["compliance_flag"], "APPROVED");
        assert_eq!(json["context"]["retry_after_seconds"], 12);
    }

    #[test]
    fn test_memory_sink_separates_channels() {
        let ctx = RequestContext::new(None, ToolName::CheckSuitability);
        let sink = MemoryAuditSink::new();
        let event = AuditEvent::new(&ctx, Severity::Notice, "compliance_check", "ok");
        sink.emit(&event);
        sink.emit_security(&event);
        sink.emit(&event);

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.security_events().len(), 1);
        assert_eq!(sink.events_of_type("compliance_check").len(), 2);
    }
}
