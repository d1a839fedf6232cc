//! Routing of approved tickers to human review.

use std::collections::HashSet;
use std::sync::Arc;

use finintel_core::{AuditEvent, AuditSink, ComplianceFlag, RequestContext, Severity, TickerSymbol};
use serde::{Deserialize, Serialize};

use crate::config::WatchlistConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistDecision {
    pub is_watchlist: bool,
    pub hitl_required: bool,
}

impl WatchlistDecision {
    pub fn listed() -> Self {
        Self {
            is_watchlist: true,
            hitl_required: true,
        }
    }

    pub fn not_listed() -> Self {
        Self {
            is_watchlist: false,
            hitl_required: false,
        }
    }
}

pub struct WatchlistGate {
    tickers: HashSet<String>,
    audit: Arc<dyn AuditSink>,
}

impl WatchlistGate {
    pub fn new(config: &WatchlistConfig, audit: Arc<dyn AuditSink>) -> Self {
        let tickers = config
            .tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { tickers, audit }
    }

    pub fn check(&self, ctx: &RequestContext, ticker: &TickerSymbol) -> WatchlistDecision {
        let decision = if self.tickers.contains(ticker.as_str()) {
            WatchlistDecision::listed()
        } else {
            WatchlistDecision::not_listed()
        };

        let (severity, message) = if decision.is_watchlist {
            (Severity::Notice, format!("{ticker} is on the watchlist; human approval required"))
        } else {
            (Severity::Informational, format!("{ticker} is not on the watchlist"))
        };
        let event = AuditEvent::new(ctx, severity, "watchlist_check", message)
            .with_flag(if decision.hitl_required {
                ComplianceFlag::Pending
            } else {
                ComplianceFlag::Approved
            })
            .with_field("ticker", ticker.as_str())
            .with_field("is_watchlist", decision.is_watchlist);
        self.audit.emit(&event);

        decision
    }
}
