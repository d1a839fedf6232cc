//! Layered compliance evaluation.

use std::sync::Arc;

use async_trait::async_trait;
use finintel_core::{
    redact, AuditEvent, AuditSink, Clock, ComplianceFlag, RequestContext, Severity,
};
use finintel_provider::{MarketDataClient, OwnershipSnapshot, ProviderError};
use finintel_telemetry::Metrics;
use tracing::{debug, warn};

use crate::config::ComplianceConfig;
use crate::verdict::{ComplianceLevel, ComplianceVerdict, RiskLevel};

const CHECK_HARD_BLOCKLIST: &str = "Hard blocklist screening (Layer 1)";
const CHECK_WATCHLIST: &str = "Enhanced watchlist verification (Layer 2)";
const CHECK_OWNERSHIP_PATTERNS: &str = "Ownership structure analysis (Layer 3)";
const CHECK_OWNERSHIP_VERIFIED: &str =
    "Beneficial owner screening (Layer 4) - Ownership data verified";
const CHECK_OWNERSHIP_SKIPPED: &str = "Beneficial owner screening (Layer 4) - Skipped by configuration";

const EVIDENCE_MAX_CHARS: usize = 100;

const WATCHLIST_NEXT_STEPS: &[&str] = &[
    "Manual compliance review required",
    "Ownership structure verification needed",
    "Enhanced due diligence (EDD) process initiated",
    "Approval from Compliance Officer required",
];

const OWNERSHIP_REVIEW_NEXT_STEPS: &[&str] = &[
    "Beneficial ownership verification required",
    "Ultimate beneficial owner (UBO) identification needed",
    "Compliance review by senior officer",
];

const DATA_UNAVAILABLE_NEXT_STEPS: &[&str] = &[
    "Manual ownership verification required",
    "Direct company filing review needed (SEC EDGAR, etc.)",
    "Cannot proceed without verified ownership structure",
    "Compliance officer approval required for override",
];

const VERIFICATION_ERROR_NEXT_STEPS: &[&str] = &[
    "Technical review required - ownership data retrieval failed",
    "Manual verification process required",
    "System administrator notification sent",
    "Cannot approve without ownership verification",
];

/// Source of beneficial-ownership data for layer 4.
#[async_trait]
pub trait OwnershipLookup: Send + Sync {
    async fn ownership(&self, symbol: &str) -> Result<OwnershipSnapshot, ProviderError>;
}

#[async_trait]
impl OwnershipLookup for MarketDataClient {
    async fn ownership(&self, symbol: &str) -> Result<OwnershipSnapshot, ProviderError> {
        self.fetch_ownership(symbol).await
    }
}

pub struct ComplianceEngine {
    config: ComplianceConfig,
    ownership: Arc<dyn OwnershipLookup>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl ComplianceEngine {
    pub fn new(
        config: ComplianceConfig,
        ownership: Arc<dyn OwnershipLookup>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            ownership,
            audit,
            clock,
        }
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// Screen `symbol` through every layer; the first denial wins.
    ///
    /// `symbol` is compared in uppercase. The lookup in layer 4 is the only
    /// external call and only runs when layers 1-3 pass.
    pub async fn evaluate(&self, ctx: &RequestContext, symbol: &str) -> ComplianceVerdict {
        let symbol = symbol.trim().to_uppercase();
        let verdict = self.screen(ctx, &symbol).await;
        self.record(ctx, &verdict);
        verdict
    }

    async fn screen(&self, ctx: &RequestContext, symbol: &str) -> ComplianceVerdict {
        let now = self.clock.now_utc();
        let mut checks = vec![CHECK_HARD_BLOCKLIST.to_string()];

        if let Some(rule) = self
            .config
            .hard_blocklist
            .iter()
            .find(|rule| rule.mode.matches(symbol, &rule.term))
        {
            let mut verdict = ComplianceVerdict::denied(
                symbol,
                ComplianceLevel::HardBlock,
                RiskLevel::Critical,
                format!("CRITICAL: Ticker matches blocklisted term '{}'", rule.term),
                now,
            )
            .with_evidence(format!("Blocklist rule '{}' ({})", rule.term, rule.mode.as_str()));
            verdict.requires_review = false;
            verdict.escalation_required = true;
            verdict.checks_performed = checks;
            return verdict;
        }

        checks.push(CHECK_WATCHLIST.to_string());
        if let Some(entry) = self.config.enhanced_watchlist.get(symbol) {
            warn!(
                ticker = symbol,
                risk_level = entry.risk_level.as_str(),
                concern = %entry.concern,
                "Watchlist alert: {}",
                entry.reason
            );
            let mut verdict = ComplianceVerdict::denied(
                symbol,
                ComplianceLevel::WatchlistHold,
                entry.risk_level,
                format!("WATCHLIST ALERT: {}", entry.reason),
                now,
            )
            .with_evidence(entry.reason.clone())
            .with_evidence(entry.concern.clone())
            .with_next_steps(WATCHLIST_NEXT_STEPS);
            verdict.escalation_required = true;
            verdict.checks_performed = checks;
            return verdict;
        }

        checks.push(CHECK_OWNERSHIP_PATTERNS.to_string());
        if let Some(pattern) = self
            .config
            .ownership_patterns
            .iter()
            .find(|p| p.mode.matches(symbol, &p.term))
        {
            warn!(
                ticker = symbol,
                pattern = %pattern.term,
                "Ownership structure concern: {}",
                pattern.concern
            );
            let mut verdict = ComplianceVerdict::denied(
                symbol,
                ComplianceLevel::OwnershipReview,
                RiskLevel::High,
                format!("OWNERSHIP CONCERN: {}", pattern.concern),
                now,
            )
            .with_evidence(pattern.concern.clone())
            .with_next_steps(OWNERSHIP_REVIEW_NEXT_STEPS);
            verdict.escalation_required = true;
            verdict.checks_performed = checks;
            return verdict;
        }

        if !self.config.verify_ownership {
            checks.push(CHECK_OWNERSHIP_SKIPPED.to_string());
            return self.cleared(symbol, checks);
        }

        match self.ownership.ownership(symbol).await {
            Ok(snapshot) if snapshot.has_data() => {
                debug!(
                    ticker = symbol,
                    institutional_holders = snapshot.institutional_holders,
                    major_holders = snapshot.major_holders,
                    "Ownership verification successful"
                );
                checks.push(CHECK_OWNERSHIP_VERIFIED.to_string());
                self.cleared(symbol, checks)
            }
            Ok(_) => {
                warn!(ticker = symbol, "No ownership data available");
                let mut verdict = ComplianceVerdict::denied(
                    symbol,
                    ComplianceLevel::OwnershipDataUnavailable,
                    RiskLevel::High,
                    "OWNERSHIP VERIFICATION FAILED: Unable to verify beneficial ownership structure",
                    now,
                )
                .with_evidence("No institutional ownership data available")
                .with_evidence("No major holders data available")
                .with_next_steps(DATA_UNAVAILABLE_NEXT_STEPS);
                verdict.escalation_required = true;
                verdict.checks_performed = checks;
                verdict
            }
            Err(e) => {
                let detail = self.redacted(ctx, &e.to_string());
                warn!(ticker = symbol, error = %detail, "Ownership verification error");
                let mut verdict = ComplianceVerdict::denied(
                    symbol,
                    ComplianceLevel::OwnershipVerificationError,
                    RiskLevel::High,
                    "OWNERSHIP VERIFICATION ERROR: System unable to verify ownership structure",
                    now,
                )
                .with_evidence(format!("Ownership verification error: {detail}"))
                .with_next_steps(VERIFICATION_ERROR_NEXT_STEPS);
                verdict.escalation_required = true;
                verdict.checks_performed = checks;
                verdict
            }
        }
    }

    fn cleared(&self, symbol: &str, checks: Vec<String>) -> ComplianceVerdict {
        let mut verdict = ComplianceVerdict::cleared(symbol, self.clock.now_utc());
        verdict.reason =
            "Passed all enhanced compliance checks with verified ownership structure".to_string();
        verdict.checks_performed = checks;
        verdict
    }

    fn redacted(&self, ctx: &RequestContext, text: &str) -> String {
        let (clean, applied) = redact(text);
        if applied {
            let event = AuditEvent::new(
                ctx,
                Severity::Warning,
                "redaction_applied",
                "Sensitive data redacted from ownership error",
            )
            .security_alert();
            self.audit.emit_security(&event);
        }
        clean.chars().take(EVIDENCE_MAX_CHARS).collect()
    }

    fn record(&self, ctx: &RequestContext, verdict: &ComplianceVerdict) {
        Metrics::compliance_decision(verdict.status.as_str(), verdict.level.as_str());

        let (severity, flag) = if verdict.is_approved() {
            (Severity::Notice, ComplianceFlag::Approved)
        } else {
            (Severity::Warning, ComplianceFlag::Denied)
        };
        let event = AuditEvent::new(
            ctx,
            severity,
            "compliance_check",
            format!(
                "Compliance {} for {}: {}",
                verdict.status.as_str(),
                verdict.ticker,
                verdict.reason
            ),
        )
        .with_flag(flag)
        .with_field("ticker", verdict.ticker.clone())
        .with_field("compliance_level", verdict.level.as_str())
        .with_field("risk_level", verdict.risk_level.as_str());

        if verdict.is_approved() {
            self.audit.emit(&event);
        } else {
            let event = event.security_alert();
            self.audit.emit(&event);
            self.audit.emit_security(&event);
        }
    }
}
