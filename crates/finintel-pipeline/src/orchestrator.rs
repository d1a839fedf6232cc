//! Fixed-transition pipeline.
//!
//! ```text
//! Validate -> Compliance -> Watchlist -+-> Retrieve -> Success | Failed
//!                                      |
//!                                      +-> HitlPause -> HitlResolve -> Retrieve
//! ```
//! Denials end in `ValidationFailed`, `ComplianceDenied` or `HitlDenied`.
//! A pending approval suspends the run as a `pending` checkpoint; a later
//! decision claims it once and continues from `HitlResolve`.

use std::sync::Arc;

use finintel_compliance::{
    ApprovalAuthority, ApprovalRequest, ComplianceEngine, HitlDecision, HitlError, HitlStatus,
    WatchlistGate,
};
use finintel_core::{
    validate, AuditEvent, AuditSink, Clock, ComplianceFlag, CorrelationId, RequestContext,
    Severity, TickerSymbol,
};
use finintel_store::{CheckpointStatus, CheckpointStore};
use finintel_telemetry::Metrics;
use tracing::{info, warn};

use crate::clearance::Clearance;
use crate::error::{PipelineError, PipelineResult};
use crate::retrieve::Retriever;
use crate::state::{Node, PipelineState};

const ACTOR_SYSTEM: &str = "system";
const ACTOR_VALIDATOR: &str = "validator";
const ACTOR_COMPLIANCE: &str = "compliance_engine";
const ACTOR_WATCHLIST: &str = "watchlist_gate";
const ACTOR_RETRIEVER: &str = "retriever";

/// Result of running or resuming a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(PipelineState),
    /// Waiting for a human decision on `state.correlation_id`.
    Suspended(PipelineState),
}

impl RunOutcome {
    pub fn state(&self) -> &PipelineState {
        match self {
            Self::Completed(state) | Self::Suspended(state) => state,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended(_))
    }
}

pub struct Orchestrator {
    engine: Arc<ComplianceEngine>,
    gate: Arc<WatchlistGate>,
    authority: Arc<dyn ApprovalAuthority>,
    retriever: Retriever,
    checkpoints: Arc<CheckpointStore>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<ComplianceEngine>,
        gate: Arc<WatchlistGate>,
        authority: Arc<dyn ApprovalAuthority>,
        retriever: Retriever,
        checkpoints: Arc<CheckpointStore>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            gate,
            authority,
            retriever,
            checkpoints,
            audit,
            clock,
        }
    }

    /// Validate and screen only; never retrieves.
    pub async fn screen(&self, ctx: &RequestContext, raw: &str) -> PipelineState {
        let mut state = PipelineState::new(ctx, raw);
        if let Some(ticker) = self.validate_step(ctx, raw, &mut state) {
            self.compliance_step(ctx, &ticker, &mut state).await;
            if !state.is_terminal() {
                state.advance(Node::Success, ACTOR_SYSTEM, "Screening complete", self.clock.now_utc());
            }
        }
        state
    }

    /// Run the full pipeline for `raw`.
    pub async fn run(&self, ctx: &RequestContext, raw: &str) -> RunOutcome {
        let mut state = PipelineState::new(ctx, raw);

        let Some(ticker) = self.validate_step(ctx, raw, &mut state) else {
            return self.finish(state);
        };
        self.compliance_step(ctx, &ticker, &mut state).await;
        if state.is_terminal() {
            return self.finish(state);
        }

        let decision = self.gate.check(ctx, &ticker);
        state.watchlist = Some(decision);
        let now = self.clock.now_utc();
        if !decision.hitl_required {
            state.advance(Node::Watchlist, ACTOR_WATCHLIST, "Not on watchlist", now);
            self.retrieve_step(ctx, &ticker, &mut state).await;
            return self.finish(state);
        }
        state.advance(Node::Watchlist, ACTOR_WATCHLIST, "On watchlist; human approval required", now);

        let request = ApprovalRequest {
            correlation_id: ctx.correlation_id.to_string(),
            session_id: ctx.session_id.clone(),
            ticker: ticker.to_string(),
            reason: format!("{ticker} is on the HITL watchlist"),
            requested_at: self.clock.now_utc(),
        };
        let approval = self.authority.request_approval(&request).await;
        let pending = approval.is_pending();
        state.approval = Some(approval);
        state.advance(
            Node::HitlPause,
            self.authority.name(),
            if pending { "Awaiting human decision" } else { "Decided by approval authority" },
            self.clock.now_utc(),
        );

        if pending {
            return self.suspend(ctx, &ticker, state);
        }
        self.resolve_step(ctx, &ticker, &mut state).await;
        self.finish(state)
    }

    /// Apply a human decision to a suspended run and continue it.
    ///
    /// A checkpoint is claimed at most once. While a claim is being applied
    /// other calls fail with `DECISION_IN_PROGRESS`, after it completes with
    /// `ALREADY_RESOLVED`. Unknown ids fail with `NOT_FOUND`.
    pub async fn resume(&self, correlation_id: &CorrelationId, decision: &HitlDecision) -> PipelineResult<PipelineState> {
        let Some(checkpoint) = self.checkpoints.claim_pending(correlation_id)? else {
            return Err(match self.checkpoints.load(correlation_id)? {
                Some(existing) if existing.status == CheckpointStatus::Resolving => {
                    PipelineError::DecisionInProgress(correlation_id.to_string())
                }
                Some(existing) if existing.status == CheckpointStatus::Completed => {
                    PipelineError::Hitl(HitlError::AlreadyResolved(decided_status(
                        &existing.state_json,
                    )))
                }
                _ => PipelineError::NotFound(correlation_id.to_string()),
            });
        };

        let mut state: PipelineState = match serde_json::from_str(&checkpoint.state_json) {
            Ok(state) => state,
            Err(e) => {
                self.release(correlation_id);
                return Err(PipelineError::Internal(format!("unreadable checkpoint: {e}")));
            }
        };
        let (Some(ticker), Some(approval)) = (state.ticker.clone(), state.approval.as_mut()) else {
            self.release(correlation_id);
            return Err(PipelineError::Internal("checkpoint missing approval".to_string()));
        };
        if let Err(e) = approval.resolve(decision, self.clock.now_utc()) {
            self.release(correlation_id);
            return Err(e.into());
        }
        self.authority.decided(correlation_id.as_str());

        let ctx = RequestContext::resumed(correlation_id.clone(), state.session_id.clone(), state.tool);
        self.resolve_step(&ctx, &ticker, &mut state).await;

        match serde_json::to_string(&state) {
            Ok(json) => match self.checkpoints.complete(correlation_id, &json) {
                Ok(true) => {}
                Ok(false) => warn!(correlation_id = %correlation_id, "Checkpoint was not in resolving state"),
                Err(e) => {
                    self.release(correlation_id);
                    return Err(e.into());
                }
            },
            Err(e) => warn!(correlation_id = %correlation_id, error = %e, "Final state not persisted"),
        }
        self.refresh_pending_gauge();
        Ok(self.finish_state(state))
    }

    fn validate_step(&self, ctx: &RequestContext, raw: &str, state: &mut PipelineState) -> Option<TickerSymbol> {
        match validate(ctx, self.audit.as_ref(), raw) {
            Ok(ticker) => {
                state.advance(Node::Validate, ACTOR_VALIDATOR, format!("Validated {ticker}"), self.clock.now_utc());
                state.ticker = Some(ticker.clone());
                Some(ticker)
            }
            Err(e) => {
                Metrics::validation_failed(e.code());
                state.fail(&PipelineError::from(e), ACTOR_VALIDATOR, self.clock.now_utc());
                None
            }
        }
    }

    async fn compliance_step(&self, ctx: &RequestContext, ticker: &TickerSymbol, state: &mut PipelineState) {
        let verdict = self.engine.evaluate(ctx, ticker.as_str()).await;
        let now = self.clock.now_utc();
        if verdict.is_approved() {
            state.advance(Node::Compliance, ACTOR_COMPLIANCE, verdict.reason.clone(), now);
            state.verdict = Some(verdict);
        } else {
            state.verdict = Some(verdict.clone());
            state.fail(
                &PipelineError::ComplianceDenied {
                    verdict: Box::new(verdict),
                },
                ACTOR_COMPLIANCE,
                now,
            );
        }
    }

    async fn resolve_step(&self, ctx: &RequestContext, ticker: &TickerSymbol, state: &mut PipelineState) {
        let Some(approval) = state.approval.clone() else {
            state.fail(
                &PipelineError::Internal("no approval to resolve".to_string()),
                ACTOR_SYSTEM,
                self.clock.now_utc(),
            );
            return;
        };
        let approver = approval.approver.clone().unwrap_or_default();
        let now = self.clock.now_utc();

        if approval.is_approved() {
            Metrics::hitl_outcome("approved");
            state.advance(Node::HitlResolve, &approver, "Approved by reviewer", now);
            self.audit_hitl(ctx, ticker, Severity::Notice, ComplianceFlag::Approved, "hitl_approved", &approver);
            self.retrieve_step(ctx, ticker, state).await;
        } else {
            Metrics::hitl_outcome("denied");
            state.advance(Node::HitlResolve, &approver, "Denied by reviewer", now);
            self.audit_hitl(ctx, ticker, Severity::Warning, ComplianceFlag::Denied, "hitl_denied", &approver);
            state.fail(
                &PipelineError::HitlDenied {
                    ticker: ticker.to_string(),
                    approver,
                },
                ACTOR_SYSTEM,
                self.clock.now_utc(),
            );
        }
    }

    async fn retrieve_step(&self, ctx: &RequestContext, ticker: &TickerSymbol, state: &mut PipelineState) {
        let clearance = match (&state.verdict, &state.watchlist) {
            (Some(verdict), Some(watchlist)) => {
                Clearance::grant(ticker, verdict, watchlist, state.approval.as_ref())
            }
            _ => None,
        };
        let Some(clearance) = clearance else {
            state.fail(
                &PipelineError::Internal("retrieval attempted without clearance".to_string()),
                ACTOR_SYSTEM,
                self.clock.now_utc(),
            );
            return;
        };

        state.advance(Node::Retrieve, ACTOR_RETRIEVER, format!("Retrieving {ticker}"), self.clock.now_utc());
        match self.retriever.retrieve(ctx, &clearance).await {
            Ok(retrieved) => {
                state.cache_hit = retrieved.cache_hit;
                state.record = Some(retrieved.record);
                let message = if retrieved.cache_hit { "Served from cache" } else { "Fetched from provider" };
                state.advance(Node::Success, ACTOR_RETRIEVER, message, self.clock.now_utc());
            }
            Err(e) => state.fail(&e, ACTOR_RETRIEVER, self.clock.now_utc()),
        }
    }

    fn suspend(&self, ctx: &RequestContext, ticker: &TickerSymbol, state: PipelineState) -> RunOutcome {
        let saved = serde_json::to_string(&state)
            .map_err(|e| PipelineError::Internal(format!("state serialization failed: {e}")))
            .and_then(|json| {
                self.checkpoints
                    .save_pending(&ctx.correlation_id, &ctx.session_id, ticker.as_str(), &json)
                    .map_err(PipelineError::from)
            });

        match saved {
            Ok(()) => {
                info!(correlation_id = %ctx.correlation_id, ticker = %ticker, "Pipeline suspended for approval");
                self.audit_hitl(ctx, ticker, Severity::Notice, ComplianceFlag::Pending, "hitl_pending", "");
                Metrics::hitl_outcome("pending");
                Metrics::pipeline_outcome("suspended");
                self.refresh_pending_gauge();
                RunOutcome::Suspended(state)
            }
            Err(e) => {
                let mut state = state;
                state.fail(&e, ACTOR_SYSTEM, self.clock.now_utc());
                self.finish(state)
            }
        }
    }

    fn finish(&self, state: PipelineState) -> RunOutcome {
        RunOutcome::Completed(self.finish_state(state))
    }

    fn finish_state(&self, state: PipelineState) -> PipelineState {
        let outcome = state.node.as_str();
        Metrics::pipeline_outcome(outcome);
        info!(
            correlation_id = %state.correlation_id,
            outcome,
            steps = state.trail.len(),
            "Pipeline finished"
        );
        state
    }

    fn release(&self, correlation_id: &CorrelationId) {
        if let Err(e) = self.checkpoints.release(correlation_id) {
            warn!(correlation_id = %correlation_id, error = %e, "Checkpoint release failed");
        }
    }

    fn refresh_pending_gauge(&self) {
        match self.checkpoints.list_pending() {
            Ok(pending) => Metrics::hitl_pending_set(pending.len() as i64),
            Err(e) => warn!(error = %e, "Could not count pending approvals"),
        }
    }

    fn audit_hitl(
        &self,
        ctx: &RequestContext,
        ticker: &TickerSymbol,
        severity: Severity,
        flag: ComplianceFlag,
        event_type: &str,
        approver: &str,
    ) {
        let mut event = AuditEvent::new(ctx, severity, event_type, format!("HITL {} for {ticker}", flag.as_str()))
            .with_flag(flag)
            .with_field("ticker", ticker.as_str());
        if !approver.is_empty() {
            event = event.with_field("approver", approver);
        }
        if flag == ComplianceFlag::Denied {
            let event = event.security_alert();
            self.audit.emit(&event);
            self.audit.emit_security(&event);
        } else {
            self.audit.emit(&event);
        }
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }
}

/// Status recorded in a checkpoint that can no longer be claimed.
fn decided_status(state_json: &str) -> HitlStatus {
    serde_json::from_str::<PipelineState>(state_json)
        .ok()
        .and_then(|s| s.approval)
        .map_or(HitlStatus::Pending, |a| a.status)
}
