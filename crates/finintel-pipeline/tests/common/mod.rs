//! Wiring shared by the pipeline integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use finintel_compliance::{
    ApprovalAuthority, ComplianceConfig, ComplianceEngine, ManualApprovalQueue, WatchlistConfig,
    WatchlistGate,
};
use finintel_core::{AuditSink, Clock, ManualClock, MemoryAuditSink};
use finintel_pipeline::{GatewayService, Orchestrator, Retriever};
use finintel_provider::{MarketDataClient, OwnershipSnapshot, StaticSource, WorkerPool};
use finintel_store::{CacheConfig, CacheStore, CheckpointStore, Database, RateLimitConfig, RateLimiter};
use tempfile::TempDir;

pub const START_MS: i64 = 1_700_000_000_000;

pub fn listed_ownership() -> OwnershipSnapshot {
    OwnershipSnapshot {
        institutional_holders: 10,
        major_holders: 4,
    }
}

pub struct Harness {
    pub service: GatewayService,
    pub source: Arc<StaticSource>,
    pub sink: MemoryAuditSink,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<CacheStore>,
    pub checkpoints: Arc<CheckpointStore>,
    _dir: TempDir,
}

pub struct HarnessBuilder {
    compliance: ComplianceConfig,
    watchlist: WatchlistConfig,
    rate_limit: RateLimitConfig,
    cache: CacheConfig,
    authority: Arc<dyn ApprovalAuthority>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            compliance: ComplianceConfig::default(),
            watchlist: WatchlistConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            authority: Arc::new(ManualApprovalQueue::new()),
        }
    }
}

impl HarnessBuilder {
    pub fn compliance(mut self, config: ComplianceConfig) -> Self {
        self.compliance = config;
        self
    }

    pub fn watchlist(mut self, tickers: &[&str]) -> Self {
        self.watchlist = WatchlistConfig {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
        };
        self
    }

    pub fn cache_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.cache = CacheConfig { ttl_secs };
        self
    }

    pub fn authority(mut self, authority: Arc<dyn ApprovalAuthority>) -> Self {
        self.authority = authority;
        self
    }

    pub fn build(self, source: StaticSource) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_path(&dir.path().join("gateway.db")).unwrap();
        let clock = Arc::new(ManualClock::new(START_MS));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let sink = MemoryAuditSink::new();
        let audit: Arc<dyn AuditSink> = Arc::new(sink.clone());
        let source = Arc::new(source);

        let client = MarketDataClient::new(source.clone(), WorkerPool::new(4, Duration::from_secs(5)));
        let cache = Arc::new(CacheStore::new(db.clone(), dyn_clock.clone(), &self.cache));
        let limiter = Arc::new(RateLimiter::new(db.clone(), dyn_clock.clone(), self.rate_limit));
        let checkpoints = Arc::new(CheckpointStore::new(db, dyn_clock.clone()));

        let engine = Arc::new(ComplianceEngine::new(
            self.compliance,
            Arc::new(client.clone()),
            audit.clone(),
            dyn_clock.clone(),
        ));
        let gate = Arc::new(WatchlistGate::new(&self.watchlist, audit.clone()));
        let retriever = Retriever::new(cache.clone(), limiter, client, audit.clone(), dyn_clock.clone());
        let orchestrator = Arc::new(Orchestrator::new(
            engine,
            gate,
            self.authority,
            retriever,
            checkpoints.clone(),
            audit.clone(),
            dyn_clock.clone(),
        ));
        let service = GatewayService::new(orchestrator, cache.clone(), audit, dyn_clock);

        Harness {
            service,
            source,
            sink,
            clock,
            cache,
            checkpoints,
            _dir: dir,
        }
    }
}
