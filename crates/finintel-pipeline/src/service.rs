//! Gateway operations over untrusted input.

use std::sync::Arc;

use finintel_compliance::{ComplianceVerdict, HitlDecision};
use finintel_core::{
    redact, AuditEvent, AuditSink, Clock, CorrelationId, RequestContext, Severity, ToolName,
};
use finintel_store::CacheStore;
use tracing::error;

use crate::error::PipelineError;
use crate::orchestrator::{Orchestrator, RunOutcome};
use crate::response::{
    CacheStatsResponse, ErrorResponse, GatewayResponse, MarketDataResponse, PendingListResponse,
    PendingResponse, SuitabilityResponse,
};
use crate::state::{Failure, Node, PipelineState};

pub struct GatewayService {
    orchestrator: Arc<Orchestrator>,
    cache: Arc<CacheStore>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl GatewayService {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        cache: Arc<CacheStore>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            audit,
            clock,
        }
    }

    /// Compliance verdict for `raw`; never retrieves data.
    pub async fn check_suitability(&self, raw: &str, session_id: Option<&str>) -> GatewayResponse {
        let ctx = RequestContext::new(session_id, ToolName::CheckSuitability);
        let state = self.orchestrator.screen(&ctx, raw).await;
        self.respond(&ctx, state)
    }

    /// Full pipeline for `raw`: screening, watchlist, retrieval.
    pub async fn get_market_data(&self, raw: &str, session_id: Option<&str>) -> GatewayResponse {
        let ctx = RequestContext::new(session_id, ToolName::GetMarketData);
        match self.orchestrator.run(&ctx, raw).await {
            RunOutcome::Suspended(state) => {
                let ticker = state.ticker.as_ref().map(|t| t.to_string()).unwrap_or_default();
                GatewayResponse::Pending(PendingResponse::new(&state.correlation_id, &ticker))
            }
            RunOutcome::Completed(state) => self.respond(&ctx, state),
        }
    }

    pub async fn submit_hitl_decision(&self, correlation_id: &str, decision: HitlDecision) -> GatewayResponse {
        let id = CorrelationId::from_string(correlation_id.trim());
        let ctx = RequestContext::resumed(id.clone(), String::new(), ToolName::SubmitHitlDecision);
        match self.orchestrator.resume(&id, &decision).await {
            Ok(state) => {
                let ctx = RequestContext::resumed(id, state.session_id.clone(), state.tool);
                self.respond(&ctx, state)
            }
            Err(e) => self.error_from(&ctx, &Failure::from(&e), None, None),
        }
    }

    pub fn pending_approvals(&self) -> GatewayResponse {
        match self.orchestrator.checkpoints().list_pending() {
            Ok(records) => GatewayResponse::PendingList(PendingListResponse {
                error: false,
                error_code: None,
                pending: records.into_iter().map(Into::into).collect(),
            }),
            Err(e) => self.internal(ToolName::SubmitHitlDecision, PipelineError::from(e)),
        }
    }

    pub fn cache_stats(&self) -> GatewayResponse {
        match self.cache.stats() {
            Ok(stats) => GatewayResponse::CacheStats(CacheStatsResponse {
                error: false,
                error_code: None,
                stats,
            }),
            Err(e) => self.internal(ToolName::GetMarketData, PipelineError::from(e)),
        }
    }

    fn respond(&self, ctx: &RequestContext, state: PipelineState) -> GatewayResponse {
        if let Some(failure) = &state.failure {
            let verdict = (state.node == Node::ComplianceDenied)
                .then(|| state.verdict.clone())
                .flatten();
            let ticker = state.ticker.as_ref().map(|t| t.to_string());
            return self.error_from(ctx, failure, ticker, verdict);
        }

        match (state.tool, state.record, state.verdict) {
            (ToolName::CheckSuitability, _, Some(verdict)) => {
                GatewayResponse::Suitability(Box::new(SuitabilityResponse {
                    error: false,
                    error_code: None,
                    correlation_id: state.correlation_id,
                    verdict,
                }))
            }
            (_, Some(record), _) => GatewayResponse::MarketData(Box::new(MarketDataResponse {
                error: false,
                error_code: None,
                correlation_id: state.correlation_id,
                cache_hit: state.cache_hit,
                record,
            })),
            _ => self.internal(
                ctx.tool_name,
                PipelineError::Internal("pipeline ended without a result".to_string()),
            ),
        }
    }

    fn internal(&self, tool: ToolName, err: PipelineError) -> GatewayResponse {
        error!(error = %err, "Gateway operation failed");
        let ctx = RequestContext::new(None, tool);
        self.error_from(&ctx, &Failure::from(&err), None, None)
    }

    fn error_from(
        &self,
        ctx: &RequestContext,
        failure: &Failure,
        ticker: Option<String>,
        verdict: Option<ComplianceVerdict>,
    ) -> GatewayResponse {
        let mut redacted = false;
        let mut scrub = |text: &str| {
            let (clean, applied) = redact(text);
            redacted |= applied;
            clean
        };
        let message = scrub(&failure.message);
        let detail = scrub(&failure.detail);
        let troubleshooting = scrub(&failure.troubleshooting);

        if redacted {
            let event = AuditEvent::new(
                ctx,
                Severity::Warning,
                "redaction_applied",
                "Sensitive data redacted from error response",
            )
            .with_field("error_code", failure.code.clone())
            .security_alert();
            self.audit.emit(&event);
            self.audit.emit_security(&event);
        }

        GatewayResponse::Error(ErrorResponse {
            error: true,
            error_code: failure.code.clone(),
            correlation_id: ctx.correlation_id.to_string(),
            ticker,
            message,
            detail,
            troubleshooting,
            retry_after_seconds: failure.retry_after_seconds,
            verdict,
            retrieved_at: self.clock.now_utc(),
        })
    }
}
