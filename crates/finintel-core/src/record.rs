//! Provider-independent financial record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CLASSIFICATION: &str = "CONFIDENTIAL - INTERNAL USE ONLY";
pub const DISCLAIMER: &str = "NON-ADVISORY ONLY - For analysis purposes exclusively";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Minimum number of valuation ratios (out of 5) for a usable record.
pub const MIN_VALUATION_RATIOS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub ticker: String,
    pub retrieved_at: DateTime<Utc>,
    pub data_source: String,
    pub classification: String,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInformation {
    pub ticker: String,
    pub entity_name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub current_price: Option<f64>,
    pub currency: String,
    pub market_cap: Option<i64>,
    pub market_cap_formatted: Option<String>,
    pub enterprise_value: Option<i64>,
    pub volume: Option<i64>,
    pub avg_volume: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationRatios {
    pub forward_pe: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub peg_ratio: Option<f64>,
}

impl ValuationRatios {
    pub fn present_count(&self) -> usize {
        [
            self.forward_pe,
            self.trailing_pe,
            self.price_to_book,
            self.price_to_sales,
            self.peg_ratio,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialHealth {
    pub dividend_yield: Option<f64>,
    pub dividend_rate: Option<f64>,
    pub profit_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalystMetrics {
    pub recommendation: Option<String>,
    pub recommendation_mean: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub number_of_analyst_opinions: Option<i64>,
}

/// Normalized market data returned to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub metadata: RecordMetadata,
    pub entity_information: EntityInformation,
    pub market_metrics: MarketMetrics,
    pub valuation_ratios: ValuationRatios,
    pub financial_health: FinancialHealth,
    pub analyst_metrics: AnalystMetrics,
}

impl NormalizedRecord {
    /// Checks the minimum-data contract, returning the rejection reason.
    pub fn check_sufficiency(&self) -> Result<(), String> {
        if self.entity_information.entity_name.trim().is_empty() {
            return Err("Missing entity name - possible invalid ticker".to_string());
        }
        if self.market_metrics.current_price.is_none() && self.market_metrics.market_cap.is_none()
        {
            return Err(
                "Missing critical market metrics - API may have throttled request".to_string(),
            );
        }
        let ratios = self.valuation_ratios.present_count();
        if ratios < MIN_VALUATION_RATIOS {
            return Err(format!(
                "Insufficient valuation data ({ratios}/5 ratios) - data may be incomplete"
            ));
        }
        Ok(())
    }

    pub fn has_sufficient_data(&self) -> bool {
        self.check_sufficiency().is_ok()
    }
}

/// Format a market capitalization in billions (`$2950.00B`).
pub fn format_market_cap(market_cap: i64) -> String {
    format!("${:.2}B", market_cap as f64 / 1e9)
}
