//! Provider error types.

use std::time::Duration;

use thiserror::Error;

/// Failure inside a `MarketDataSource` call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned HTTP {status}")]
    Http { status: u16 },

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Upstream authentication failed: {0}")]
    Auth(String),
}

/// Failure dispatching work to the blocking worker pool.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Provider call exceeded {0:?}")]
    Timeout(Duration),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),

    #[error("Worker pool is closed")]
    Closed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A present field could not be mapped to its typed slot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Field '{field}' has unexpected type: expected {expected}")]
pub struct MappingError {
    pub field: String,
    pub expected: &'static str,
}

/// Terminal retrieval outcomes other than success.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetrievalError {
    /// Empty or near-empty upstream response.
    #[error("Upstream returned {field_count} fields; request was likely throttled")]
    ApiThrottle { field_count: usize },

    /// No price field of any kind.
    #[error("No price data returned; ticker may be invalid or delisted")]
    InvalidTicker,

    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("Failed to process upstream data: {detail}")]
    UnknownError { detail: String },

    #[error("Failed to reach upstream provider: {detail}")]
    NetworkError { detail: String },
}

impl RetrievalError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ApiThrottle { .. } => "API_THROTTLE",
            Self::InvalidTicker => "INVALID_TICKER",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::UnknownError { .. } => "UNKNOWN_ERROR",
            Self::NetworkError { .. } => "NETWORK_ERROR",
        }
    }

    pub fn troubleshooting(&self) -> &'static str {
        match self {
            Self::ApiThrottle { .. } => {
                "Wait 60 seconds before retrying. The upstream provider may be rate limiting requests."
            }
            Self::InvalidTicker => {
                "Verify the ticker symbol is correct and actively traded on a supported exchange."
            }
            Self::InsufficientData { .. } => {
                "The upstream response was incomplete. Retry later or use an alternative data source."
            }
            Self::UnknownError { .. } => {
                "The upstream response could not be processed. Contact support if this persists."
            }
            Self::NetworkError { .. } => {
                "Check network connectivity to the upstream provider and retry."
            }
        }
    }
}

impl From<ProviderError> for RetrievalError {
    fn from(err: ProviderError) -> Self {
        Self::NetworkError {
            detail: err.to_string(),
        }
    }
}

impl From<MappingError> for RetrievalError {
    fn from(err: MappingError) -> Self {
        Self::UnknownError {
            detail: err.to_string(),
        }
    }
}
