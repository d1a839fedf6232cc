//! Core domain types for the FinIntel gateway.
//!
//! This crate provides the fundamental types shared by every stage of the
//! compliance-gated retrieval pipeline:
//! - `TickerSymbol`: Validated 1-5 letter instrument identifier
//! - `validate`: Input validation with adversarial-pattern screening
//! - `redact`: Sensitive-data scrubbing for error messages
//! - `RequestContext`: Per-request correlation and session identity
//! - `AuditEvent`, `AuditSink`: Structured audit observations
//! - `NormalizedRecord`: Provider-independent financial record

pub mod audit;
pub mod clock;
pub mod context;
pub mod error;
pub mod record;
pub mod security;
pub mod severity;
pub mod ticker;
pub mod validator;

pub use audit::{AuditEvent, AuditSink, ComplianceFlag, MemoryAuditSink, NullAuditSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{CorrelationId, RequestContext, ToolName};
pub use error::ValidationError;
pub use record::{
    AnalystMetrics, EntityInformation, FinancialHealth, MarketMetrics, NormalizedRecord,
    RecordMetadata, ValuationRatios,
};
pub use security::{detect_injection, redact, truncate_for_log};
pub use severity::Severity;
pub use ticker::TickerSymbol;
pub use validator::validate;
