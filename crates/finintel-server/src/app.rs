//! Application wiring: stores, provider, compliance, pipeline and HTTP.

use std::sync::Arc;
use std::time::Duration;

use finintel_compliance::{ComplianceEngine, ManualApprovalQueue, WatchlistGate};
use finintel_core::{AuditSink, Clock, SystemClock};
use finintel_pipeline::{GatewayService, Orchestrator, Retriever};
use finintel_provider::{MarketDataClient, MarketDataSource, YahooSource};
use finintel_store::{CacheStore, CheckpointStore, Database, MaintenanceTask, RateLimiter};
use finintel_telemetry::TracingAuditSink;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::http::{create_router, AppState};

/// Fully wired gateway.
pub struct Application {
    config: AppConfig,
    service: Arc<GatewayService>,
    maintenance: MaintenanceTask,
}

impl Application {
    /// Wire the gateway against the Yahoo provider, the system clock and
    /// tracing-backed audit logging.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let source = Arc::new(YahooSource::new(&config.provider)?);
        Self::with_parts(config, source, Arc::new(SystemClock), Arc::new(TracingAuditSink))
    }

    /// Wire the gateway from explicit collaborators.
    pub fn with_parts(
        config: AppConfig,
        source: Arc<dyn MarketDataSource>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> AppResult<Self> {
        let db = Database::open(&config.store)?;
        let client = MarketDataClient::from_config(source, &config.provider);

        let cache = Arc::new(CacheStore::new(db.clone(), clock.clone(), &config.cache));
        let limiter = Arc::new(RateLimiter::new(db.clone(), clock.clone(), config.rate_limit.clone()));
        let checkpoints = Arc::new(CheckpointStore::new(db, clock.clone()));
        // No decision can be in flight before this process serves requests.
        checkpoints.recover_stale(Duration::ZERO)?;

        let engine = Arc::new(ComplianceEngine::new(
            config.compliance.clone().normalized()?,
            Arc::new(client.clone()),
            audit.clone(),
            clock.clone(),
        ));
        let gate = Arc::new(WatchlistGate::new(&config.watchlist, audit.clone()));
        let retriever = Retriever::new(cache.clone(), limiter.clone(), client, audit.clone(), clock.clone());
        let orchestrator = Arc::new(Orchestrator::new(
            engine,
            gate,
            Arc::new(ManualApprovalQueue::new()),
            retriever,
            checkpoints.clone(),
            audit.clone(),
            clock.clone(),
        ));
        let service = Arc::new(GatewayService::new(orchestrator, cache.clone(), audit, clock));
        let maintenance = MaintenanceTask::new(cache, limiter, checkpoints, &config.maintenance);

        Ok(Self {
            config,
            service,
            maintenance,
        })
    }

    pub fn service(&self) -> Arc<GatewayService> {
        self.service.clone()
    }

    pub fn router(&self) -> axum::Router {
        create_router(AppState::new(self.service(), self.config.telemetry.metrics_enabled))
    }

    /// Serve until ctrl-c, then stop the maintenance task.
    pub async fn run(self) -> AppResult<()> {
        let addr = self.config.server.socket_addr()?;
        let shutdown = CancellationToken::new();

        let maintenance = tokio::spawn(self.maintenance.clone().run(shutdown.clone()));

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "FinIntel gateway listening");

        let server_shutdown = shutdown.clone();
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                    () = server_shutdown.cancelled() => {}
                }
            })
            .await;

        shutdown.cancel();
        if let Err(e) = maintenance.await {
            error!(error = %e, "Maintenance task join failed");
        }

        served?;
        info!("FinIntel gateway stopped");
        Ok(())
    }
}
