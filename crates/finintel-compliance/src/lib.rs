//! Compliance screening for the FinIntel gateway.
//!
//! # Layers
//!
//! Evaluated in order; the first denial short-circuits the rest.
//! 1. Hard blocklist: sanctioned or restricted names, escalated
//! 2. Enhanced watchlist: entities under regulatory monitoring
//! 3. Ownership patterns: structures with opaque beneficial ownership
//! 4. Ownership verification: upstream holder data must exist (fail-closed)
//!
//! Approved tickers then pass through the watchlist gate, which may require
//! a human decision before data is released.

pub mod config;
pub mod engine;
pub mod error;
pub mod hitl;
pub mod verdict;
pub mod watchlist;

pub use config::{BlockRule, ComplianceConfig, MatchMode, OwnershipPattern, WatchEntry, WatchlistConfig};
pub use engine::{ComplianceEngine, OwnershipLookup};
pub use error::{ComplianceError, ComplianceResult, HitlError};
pub use hitl::{
    ApprovalAuthority, ApprovalRequest, HitlApproval, HitlDecision, HitlStatus,
    ManualApprovalQueue, StaticApprover,
};
pub use verdict::{ComplianceLevel, ComplianceStatus, ComplianceVerdict, RiskLevel};
pub use watchlist::{WatchlistDecision, WatchlistGate};
