//! Observability for the FinIntel gateway.
//!
//! - Structured logging with tracing (console, general file, security-audit file)
//! - Audit event routing onto tracing targets
//! - Prometheus metrics for compliance decisions, cache, rate limiting and retrieval

pub mod audit;
pub mod error;
pub mod logging;
pub mod metrics;

pub use audit::{TracingAuditSink, AUDIT_TARGET, SECURITY_AUDIT_TARGET};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LoggingConfig};
pub use metrics::Metrics;
