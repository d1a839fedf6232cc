//! Upstream provider interface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SourceError;

/// Raw provider response: field name to JSON value.
pub type FieldMap = Map<String, Value>;

/// Beneficial-ownership data available for a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipSnapshot {
    pub institutional_holders: usize,
    pub major_holders: usize,
}

impl OwnershipSnapshot {
    pub fn has_data(&self) -> bool {
        self.institutional_holders > 0 || self.major_holders > 0
    }
}

/// Blocking market-data provider.
///
/// Implementations may block on network I/O; callers run them through
/// [`crate::WorkerPool`], never directly on the async runtime.
#[cfg_attr(test, mockall::automock)]
pub trait MarketDataSource: Send + Sync {
    /// Provider name recorded in normalized record metadata.
    fn name(&self) -> &'static str;

    fn fetch_info(&self, symbol: &str) -> Result<FieldMap, SourceError>;

    fn fetch_ownership(&self, symbol: &str) -> Result<OwnershipSnapshot, SourceError>;
}
