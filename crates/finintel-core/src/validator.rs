//! Ticker input validation.

use crate::audit::{AuditEvent, AuditSink};
use crate::context::RequestContext;
use crate::error::ValidationError;
use crate::security::{detect_injection, truncate_for_log};
use crate::severity::Severity;
use crate::ticker::TickerSymbol;

/// Validate untrusted ticker input.
///
/// Adversarial patterns are checked against the raw input before any
/// normalization, then the trimmed/uppercased value must match the ticker
/// grammar. Every outcome is reported to `sink`.
pub fn validate(
    ctx: &RequestContext,
    sink: &dyn AuditSink,
    raw: &str,
) -> Result<TickerSymbol, ValidationError> {
    let logged_input = truncate_for_log(raw);

    if let Some(pattern) = detect_injection(raw) {
        let event = AuditEvent::new(
            ctx,
            Severity::Warning,
            "input_validation_failure",
            "Potential prompt injection detected in ticker input",
        )
        .security_alert()
        .with_field("failure_type", "PROMPT_INJECTION_ATTEMPT")
        .with_field("pattern", pattern)
        .with_field("input_value", logged_input);
        sink.emit(&event);
        sink.emit_security(&event);
        return Err(ValidationError::InjectionDetected { pattern });
    }

    match TickerSymbol::parse(raw) {
        Ok(ticker) => {
            sink.emit(
                &AuditEvent::new(
                    ctx,
                    Severity::Informational,
                    "input_validation_success",
                    format!("Ticker validated: {ticker}"),
                )
                .with_field("ticker", ticker.as_str()),
            );
            Ok(ticker)
        }
        Err(err) => {
            sink.emit(
                &AuditEvent::new(
                    ctx,
                    Severity::Warning,
                    "input_validation_failure",
                    "Ticker validation failed",
                )
                .with_field("failure_type", "INVALID_FORMAT")
                .with_field("input_value", logged_input),
            );
            Err(err)
        }
    }
}
