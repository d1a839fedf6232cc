//! Async facade over a blocking `MarketDataSource`.

use std::sync::Arc;
use std::time::Instant;

use finintel_telemetry::Metrics;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::ProviderResult;
use crate::pool::WorkerPool;
use crate::source::{FieldMap, MarketDataSource, OwnershipSnapshot};

#[derive(Clone)]
pub struct MarketDataClient {
    source: Arc<dyn MarketDataSource>,
    pool: WorkerPool,
}

impl MarketDataClient {
    pub fn new(source: Arc<dyn MarketDataSource>, pool: WorkerPool) -> Self {
        Self { source, pool }
    }

    pub fn from_config(source: Arc<dyn MarketDataSource>, config: &ProviderConfig) -> Self {
        Self::new(source, WorkerPool::new(config.max_workers, config.timeout()))
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub async fn fetch_info(&self, symbol: &str) -> ProviderResult<FieldMap> {
        let source = self.source.clone();
        let owned = symbol.to_string();
        let started = Instant::now();
        let result = self.pool.run(move || source.fetch_info(&owned)).await;
        Metrics::provider_latency("info", started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(Ok(fields)) => {
                debug!(symbol, field_count = fields.len(), "Fetched info");
                Ok(fields)
            }
            Ok(Err(e)) => {
                warn!(symbol, error = %e, "Info fetch failed");
                Err(e.into())
            }
            Err(e) => {
                warn!(symbol, error = %e, "Info fetch did not complete");
                Err(e.into())
            }
        }
    }

    pub async fn fetch_ownership(&self, symbol: &str) -> ProviderResult<OwnershipSnapshot> {
        let source = self.source.clone();
        let owned = symbol.to_string();
        let started = Instant::now();
        let result = self.pool.run(move || source.fetch_ownership(&owned)).await;
        Metrics::provider_latency("ownership", started.elapsed().as_secs_f64() * 1000.0);

        let snapshot = result??;
        debug!(
            symbol,
            institutional_holders = snapshot.institutional_holders,
            major_holders = snapshot.major_holders,
            "Fetched ownership"
        );
        Ok(snapshot)
    }
}
