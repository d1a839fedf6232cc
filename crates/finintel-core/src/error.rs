//! Error types for finintel-core.

use thiserror::Error;

/// Ticker validation failures.
///
/// Injection attempts are kept distinct from format errors so callers can
/// flag them for security review.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Ticker input is empty")]
    Empty,

    #[error(
        "Invalid ticker format: '{input}'. Ticker symbols must be 1-5 uppercase letters only (e.g., 'AAPL', 'MSFT', 'JPM')."
    )]
    InvalidFormat { input: String },

    #[error("Ticker input rejected: matched adversarial pattern '{pattern}'")]
    InjectionDetected { pattern: &'static str },
}

impl ValidationError {
    /// Machine-readable code for responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty | Self::InvalidFormat { .. } => "VALIDATION_ERROR",
            Self::InjectionDetected { .. } => "INJECTION_DETECTED",
        }
    }

    pub fn is_security_flagged(&self) -> bool {
        matches!(self, Self::InjectionDetected { .. })
    }
}
