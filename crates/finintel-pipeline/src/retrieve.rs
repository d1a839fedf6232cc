//! Cleared retrieval: cache, rate limit, upstream fetch, write-through.

use std::sync::Arc;

use finintel_core::{
    redact, AuditEvent, AuditSink, Clock, ComplianceFlag, NormalizedRecord, RequestContext, Severity,
    TickerSymbol,
};
use finintel_provider::{classify, MarketDataClient, RetrievalError};
use finintel_store::{CacheStore, RateLimiter, Reservation};
use finintel_telemetry::Metrics;
use tracing::{debug, error, info, warn};

use crate::clearance::Clearance;
use crate::error::{PipelineError, PipelineResult};

/// A record and whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub record: NormalizedRecord,
    pub cache_hit: bool,
}

#[derive(Clone)]
pub struct Retriever {
    cache: Arc<CacheStore>,
    limiter: Arc<RateLimiter>,
    client: MarketDataClient,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl Retriever {
    pub fn new(
        cache: Arc<CacheStore>,
        limiter: Arc<RateLimiter>,
        client: MarketDataClient,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            limiter,
            client,
            audit,
            clock,
        }
    }

    /// Serve `clearance.ticker()` from cache, or fetch it under the rate limit.
    ///
    /// Cache hits are not rate limited. A miss reserves a call slot before
    /// fetching; the slot is given back only when the upstream never answered.
    /// The fetch runs in its own task, so a caller that goes away still leaves
    /// the result cached.
    pub async fn retrieve(&self, ctx: &RequestContext, clearance: &Clearance) -> PipelineResult<Retrieved> {
        let ticker = clearance.ticker();

        if let Some(record) = self.cached(ticker) {
            return Ok(Retrieved {
                record,
                cache_hit: true,
            });
        }

        let (decision, reservation) = self.limiter.acquire(&ctx.session_id, ticker, ctx.tool_name)?;
        let Some(reservation) = reservation else {
            Metrics::rate_limited(ctx.tool_name.as_str());
            let window_secs = self.limiter.config().window_secs;
            let event = AuditEvent::new(
                ctx,
                Severity::Warning,
                "rate_limit_exceeded",
                format!("Rate limit exceeded for session {}", ctx.session_id),
            )
            .with_flag(ComplianceFlag::Approved)
            .with_field("ticker", ticker.as_str())
            .with_field("calls_in_window", decision.count_in_window)
            .with_field("max_calls", decision.max_calls)
            .with_field("retry_after", decision.retry_after_seconds)
            .security_alert();
            self.audit.emit(&event);
            self.audit.emit_security(&event);
            return Err(PipelineError::RateLimited {
                count_in_window: decision.count_in_window,
                max_calls: decision.max_calls,
                window_secs,
                retry_after_seconds: decision.retry_after_seconds,
            });
        };

        let worker = self.clone();
        let owned_ctx = ctx.clone();
        let owned_ticker = ticker.clone();
        let handle = tokio::spawn(async move {
            worker
                .fetch_and_store(&owned_ctx, &owned_ticker, reservation)
                .await
        });

        let record = handle
            .await
            .map_err(|e| PipelineError::Internal(format!("retrieval task failed: {e}")))??;
        Ok(Retrieved {
            record,
            cache_hit: false,
        })
    }

    fn cached(&self, ticker: &TickerSymbol) -> Option<NormalizedRecord> {
        let entry = match self.cache.get(ticker) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Cache read failed; treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&entry.payload) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Discarding unreadable cache entry");
                if let Err(e) = self.cache.invalidate(ticker) {
                    warn!(ticker = %ticker, error = %e, "Cache invalidate failed");
                }
                None
            }
        }
    }

    async fn fetch_and_store(
        &self,
        ctx: &RequestContext,
        ticker: &TickerSymbol,
        reservation: Reservation,
    ) -> PipelineResult<NormalizedRecord> {
        // Any upstream answer, hollow or not, spends the reserved call.
        let classified = match self.client.fetch_info(ticker.as_str()).await {
            Ok(fields) => classify(ticker, self.client.source_name(), &fields, self.clock.now_utc()),
            Err(e) => {
                if let Err(release_err) = self.limiter.release(reservation) {
                    warn!(ticker = %ticker, error = %release_err, "Rate limit release failed");
                }
                Err(RetrievalError::from(e))
            }
        };

        let record = match classified {
            Ok(record) => record,
            Err(e) => {
                let (message, _) = redact(&e.to_string());
                let event = AuditEvent::new(ctx, Severity::Warning, "silent_failure_detected", message)
                    .with_flag(ComplianceFlag::Approved)
                    .with_field("ticker", ticker.as_str())
                    .with_field("error_code", e.code());
                self.audit.emit(&event);
                return Err(e.into());
            }
        };

        match serde_json::to_string(&record) {
            Ok(payload) => match self.cache.put(ticker, &payload, None) {
                Ok(()) => debug!(ticker = %ticker, "Record cached"),
                Err(e) => warn!(ticker = %ticker, error = %e, "Cache write failed"),
            },
            Err(e) => error!(ticker = %ticker, error = %e, "Record serialization failed"),
        }

        info!(ticker = %ticker, source = self.client.source_name(), "Market data retrieved");
        Ok(record)
    }
}
