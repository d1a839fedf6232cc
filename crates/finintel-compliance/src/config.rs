//! `[compliance]` and `[watchlist]` configuration.
//!
//! Every list rule names its match mode explicitly. Terms and tickers are
//! compared in uppercase.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, ComplianceResult};
use crate::verdict::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Prefix,
    Contains,
}

impl MatchMode {
    pub fn matches(self, symbol: &str, term: &str) -> bool {
        match self {
            Self::Exact => symbol == term,
            Self::Prefix => symbol.starts_with(term),
            Self::Contains => symbol.contains(term),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Contains => "contains",
        }
    }
}

fn default_prefix() -> MatchMode {
    MatchMode::Prefix
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub term: String,
    #[serde(default = "default_prefix")]
    pub mode: MatchMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipPattern {
    pub term: String,
    #[serde(default = "default_prefix")]
    pub mode: MatchMode,
    pub concern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub reason: String,
    pub concern: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceConfig {
    #[serde(default = "default_hard_blocklist")]
    pub hard_blocklist: Vec<BlockRule>,
    /// Exact ticker membership.
    #[serde(default = "default_enhanced_watchlist")]
    pub enhanced_watchlist: BTreeMap<String, WatchEntry>,
    #[serde(default = "default_ownership_patterns")]
    pub ownership_patterns: Vec<OwnershipPattern>,
    /// Require upstream holder data before clearing a ticker.
    #[serde(default = "default_verify_ownership")]
    pub verify_ownership: bool,
}

fn default_hard_blocklist() -> Vec<BlockRule> {
    ["RESTRICTED", "SANCTION", "BLOCKED"]
        .into_iter()
        .map(|term| BlockRule {
            term: term.to_string(),
            mode: MatchMode::Prefix,
        })
        .collect()
}

fn watch(reason: &str, concern: &str, risk_level: RiskLevel) -> WatchEntry {
    WatchEntry {
        reason: reason.to_string(),
        concern: concern.to_string(),
        risk_level,
    }
}

fn default_enhanced_watchlist() -> BTreeMap<String, WatchEntry> {
    BTreeMap::from([
        (
            "TSLA".to_string(),
            watch(
                "Major shareholder flagged on regulatory watchlist",
                "Beneficial ownership by individual under investigation",
                RiskLevel::High,
            ),
        ),
        (
            "GME".to_string(),
            watch(
                "Unusual trading activity and governance concerns",
                "Concentrated ownership by high-risk entities",
                RiskLevel::High,
            ),
        ),
        (
            "AMC".to_string(),
            watch(
                "Corporate structure includes sanctioned jurisdictions",
                "Indirect ownership links to restricted parties",
                RiskLevel::Medium,
            ),
        ),
        (
            "BABA".to_string(),
            watch(
                "Foreign ownership structure with compliance concerns",
                "VIE structure with regulatory uncertainty",
                RiskLevel::High,
            ),
        ),
        (
            "META".to_string(),
            watch(
                "Executive on enhanced monitoring list",
                "Insider trading investigation ongoing",
                RiskLevel::Medium,
            ),
        ),
    ])
}

fn default_ownership_patterns() -> Vec<OwnershipPattern> {
    [
        ("SPAC", "Special Purpose Acquisition Company with unclear ownership"),
        ("CRYPTO", "Cryptocurrency-related entity with anonymous beneficial owners"),
        ("OTC", "Over-the-counter security with limited disclosure"),
    ]
    .into_iter()
    .map(|(term, concern)| OwnershipPattern {
        term: term.to_string(),
        mode: MatchMode::Prefix,
        concern: concern.to_string(),
    })
    .collect()
}

fn default_verify_ownership() -> bool {
    true
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            hard_blocklist: default_hard_blocklist(),
            enhanced_watchlist: default_enhanced_watchlist(),
            ownership_patterns: default_ownership_patterns(),
            verify_ownership: default_verify_ownership(),
        }
    }
}

impl ComplianceConfig {
    /// Uppercase every term and reject empty ones.
    pub fn normalized(mut self) -> ComplianceResult<Self> {
        for rule in &mut self.hard_blocklist {
            rule.term = normalize_term(&rule.term, "hard_blocklist")?;
        }
        for pattern in &mut self.ownership_patterns {
            pattern.term = normalize_term(&pattern.term, "ownership_patterns")?;
        }
        let mut watchlist = BTreeMap::new();
        for (ticker, entry) in self.enhanced_watchlist {
            watchlist.insert(normalize_term(&ticker, "enhanced_watchlist")?, entry);
        }
        self.enhanced_watchlist = watchlist;
        Ok(self)
    }
}

fn normalize_term(term: &str, list: &str) -> ComplianceResult<String> {
    let term = term.trim().to_uppercase();
    if term.is_empty() {
        return Err(ComplianceError::ConfigError(format!(
            "empty term in {list}"
        )));
    }
    Ok(term)
}

/// `[watchlist]` section: tickers that need a human decision.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistConfig {
    #[serde(default = "default_watchlist_tickers")]
    pub tickers: Vec<String>,
}

fn default_watchlist_tickers() -> Vec<String> {
    ["TSLA", "GME", "AMC", "COIN"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            tickers: default_watchlist_tickers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_modes() {
        assert!(MatchMode::Prefix.matches("RESTRICTEDX", "RESTRICTED"));
        assert!(!MatchMode::Prefix.matches("REST", "RESTRICTED"));
        assert!(!MatchMode::Prefix.matches("XOTC", "OTC"));
        assert!(MatchMode::Contains.matches("XOTC", "OTC"));
        assert!(MatchMode::Exact.matches("OTC", "OTC"));
        assert!(!MatchMode::Exact.matches("OTCX", "OTC"));
    }

    #[test]
    fn test_defaults() {
        let config = ComplianceConfig::default();
        assert_eq!(config.hard_blocklist.len(), 3);
        assert_eq!(config.enhanced_watchlist.len(), 5);
        assert_eq!(config.enhanced_watchlist["AMC"].risk_level, RiskLevel::Medium);
        assert!(config.verify_ownership);
        assert_eq!(WatchlistConfig::default().tickers, ["TSLA", "GME", "AMC", "COIN"]);
    }

    #[test]
    fn test_deserialize_partial_section() {
        let config: ComplianceConfig = serde_json::from_value(serde_json::json!({
            "hard_blocklist": [{"term": "zz"}, {"term": "QQ", "mode": "exact"}],
            "verify_ownership": false
        }))
        .unwrap();
        let config = config.normalized().unwrap();

        assert_eq!(config.hard_blocklist[0].term, "ZZ");
        assert_eq!(config.hard_blocklist[0].mode, MatchMode::Prefix);
        assert_eq!(config.hard_blocklist[1].mode, MatchMode::Exact);
        assert_eq!(config.ownership_patterns.len(), 3);
        assert!(!config.verify_ownership);
    }

    #[test]
    fn test_empty_term_rejected() {
        let mut config = ComplianceConfig::default();
        config.hard_blocklist.push(BlockRule {
            term: "  ".into(),
            mode: MatchMode::Exact,
        });
        assert!(config.normalized().is_err());
    }
}
