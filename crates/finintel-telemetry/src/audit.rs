//! Routes audit events onto tracing targets.
//!
//! RFC 5424 severities map onto tracing levels: 0-3 error, 4 warn,
//! 5-6 info, 7 debug. The numeric severity is kept as a field.

use finintel_core::{AuditEvent, AuditSink};
use tracing::Level;

/// Target for every audit event.
pub const AUDIT_TARGET: &str = "finintel::audit";
/// Target for denials and security alerts; routed to the security-audit log.
pub const SECURITY_AUDIT_TARGET: &str = "finintel::security_audit";

macro_rules! audit_at {
    ($target:expr, $level:expr, $e:expr, $context:expr) => {
        tracing::event!(
            target: $target,
            $level,
            severity = $e.severity.code(),
            correlation_id = %$e.correlation_id,
            session_id = %$e.session_id,
            tool_name = %$e.tool_name,
            compliance_flag = $e.compliance_flag.as_str(),
            event_type = %$e.event_type,
            security_alert = $e.security_alert,
            context = %$context,
            "{}",
            $e.message
        )
    };
}

macro_rules! audit {
    ($target:expr, $e:expr) => {{
        let event: &AuditEvent = $e;
        let context = serde_json::Value::Object(event.context.clone());
        match event.severity.code() {
            0..=3 => audit_at!($target, Level::ERROR, event, context),
            4 => audit_at!($target, Level::WARN, event, context),
            5 | 6 => audit_at!($target, Level::INFO, event, context),
            _ => audit_at!($target, Level::DEBUG, event, context),
        }
    }};
}

/// Production audit sink backed by `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: &AuditEvent) {
        audit!(AUDIT_TARGET, event);
    }

    fn emit_security(&self, event: &AuditEvent) {
        audit!(SECURITY_AUDIT_TARGET, event);
    }
}
