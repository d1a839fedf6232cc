//! Compliance-gated retrieval pipeline.
//!
//! [`Orchestrator`] drives one request through validation, compliance,
//! the watchlist gate and retrieval. [`GatewayService`] wraps it with the
//! public operations and turns every outcome into a JSON response.

pub mod clearance;
pub mod error;
pub mod orchestrator;
pub mod response;
pub mod retrieve;
pub mod service;
pub mod state;

pub use clearance::Clearance;
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use response::{
    CacheStatsResponse, ErrorResponse, GatewayResponse, MarketDataResponse, PendingApproval,
    PendingListResponse, PendingResponse, SuitabilityResponse, CODE_HITL_PENDING,
    STATUS_PENDING_APPROVAL,
};
pub use retrieve::{Retrieved, Retriever};
pub use service::GatewayService;
pub use state::{Failure, Node, PipelineState, TrailEntry};
