//! Local persistence for the FinIntel gateway.
//!
//! One SQLite database (pooled, WAL mode) holds three relations:
//! - `ticker_cache`: time-bounded normalized records
//! - `rate_limits`: append-only per-session call ledger
//! - `pipeline_checkpoints`: suspended pipeline states awaiting approval
//!
//! Every operation is a single statement or one immediate transaction, so
//! concurrent requests cannot interleave a read-then-write.

pub mod cache;
pub mod checkpoint;
pub mod db;
pub mod error;
pub mod maintenance;
pub mod migrations;
pub mod rate_limit;

pub use cache::{CacheConfig, CacheStats, CacheStore, CachedPayload, TickerHits};
pub use checkpoint::{CheckpointRecord, CheckpointStatus, CheckpointStore};
pub use db::{Database, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use maintenance::{MaintenanceConfig, MaintenanceReport, MaintenanceTask};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter, Reservation};
