//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] finintel_telemetry::TelemetryError),

    #[error("Store error: {0}")]
    Store(#[from] finintel_store::StoreError),

    #[error("Compliance error: {0}")]
    Compliance(#[from] finintel_compliance::ComplianceError),

    #[error("Provider error: {0}")]
    Provider(#[from] finintel_provider::ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
