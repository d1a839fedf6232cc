//! Proof that a ticker may be retrieved.

use finintel_compliance::{ComplianceVerdict, HitlApproval, WatchlistDecision};
use finintel_core::TickerSymbol;

/// Minted only by [`Clearance::grant`]; retrieval takes one by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clearance {
    ticker: TickerSymbol,
}

impl Clearance {
    /// An approved verdict for `ticker`, plus either a non-listed watchlist
    /// decision or an approved human decision.
    pub fn grant(
        ticker: &TickerSymbol,
        verdict: &ComplianceVerdict,
        watchlist: &WatchlistDecision,
        approval: Option<&HitlApproval>,
    ) -> Option<Self> {
        if !verdict.is_approved() || !verdict.data_access_approved {
            return None;
        }
        if verdict.ticker != ticker.as_str() {
            return None;
        }
        let human_ok = !watchlist.hitl_required || approval.is_some_and(HitlApproval::is_approved);
        human_ok.then(|| Self {
            ticker: ticker.clone(),
        })
    }

    pub fn ticker(&self) -> &TickerSymbol {
        &self.ticker
    }
}
