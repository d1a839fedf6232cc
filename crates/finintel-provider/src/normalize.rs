//! Typed mapping from provider field maps to `NormalizedRecord`.
//!
//! Every numeric field passes through the same sanity coercion:
//! - floats (prices, ratios, margins, yields) outside `±SANE_BOUND` or
//!   non-finite become absent
//! - integer aggregates (market cap, enterprise value, volumes, analyst
//!   count) become absent unless finite and representable as `i64`
//!
//! A present field of the wrong JSON type is a `MappingError`.

use chrono::{DateTime, Utc};
use finintel_core::record::{
    format_market_cap, AnalystMetrics, EntityInformation, FinancialHealth, MarketMetrics,
    NormalizedRecord, RecordMetadata, ValuationRatios, CLASSIFICATION, DEFAULT_CURRENCY,
    DISCLAIMER,
};
use finintel_core::TickerSymbol;
use serde_json::Value;

use crate::error::MappingError;
use crate::source::FieldMap;

/// Magnitude above which a float field is treated as garbage.
pub const SANE_BOUND: f64 = 1e10;

fn mismatch(field: &str, expected: &'static str) -> MappingError {
    MappingError {
        field: field.to_string(),
        expected,
    }
}

fn text(fields: &FieldMap, key: &str) -> Result<Option<String>, MappingError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(mismatch(key, "string")),
    }
}

fn raw_number(fields: &FieldMap, key: &str) -> Result<Option<f64>, MappingError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(mismatch(key, "number")),
    }
}

fn float(fields: &FieldMap, key: &str) -> Result<Option<f64>, MappingError> {
    Ok(raw_number(fields, key)?.filter(|v| v.is_finite() && v.abs() <= SANE_BOUND))
}

fn integer(fields: &FieldMap, key: &str) -> Result<Option<i64>, MappingError> {
    if let Some(Value::Number(n)) = fields.get(key) {
        if let Some(i) = n.as_i64() {
            return Ok(Some(i));
        }
    }
    Ok(raw_number(fields, key)?
        .filter(|v| v.is_finite() && v.abs() < i64::MAX as f64)
        .map(|v| v as i64))
}

fn first_text(fields: &FieldMap, keys: &[&str]) -> Result<Option<String>, MappingError> {
    for key in keys {
        if let Some(v) = text(fields, key)? {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

fn first_float(fields: &FieldMap, keys: &[&str]) -> Result<Option<f64>, MappingError> {
    for key in keys {
        if let Some(v) = float(fields, key)? {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

fn first_integer(fields: &FieldMap, keys: &[&str]) -> Result<Option<i64>, MappingError> {
    for key in keys {
        if let Some(v) = integer(fields, key)? {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

/// Map a provider response into a `NormalizedRecord`.
///
/// Does not judge sufficiency; see [`NormalizedRecord::check_sufficiency`].
pub fn normalize(
    ticker: &TickerSymbol,
    data_source: &str,
    fields: &FieldMap,
    retrieved_at: DateTime<Utc>,
) -> Result<NormalizedRecord, MappingError> {
    let market_cap = integer(fields, "marketCap")?;

    Ok(NormalizedRecord {
        metadata: RecordMetadata {
            ticker: ticker.to_string(),
            retrieved_at,
            data_source: data_source.to_string(),
            classification: CLASSIFICATION.to_string(),
            disclaimer: DISCLAIMER.to_string(),
        },
        entity_information: EntityInformation {
            ticker: ticker.to_string(),
            entity_name: first_text(fields, &["longName", "shortName"])?.unwrap_or_default(),
            sector: text(fields, "sector")?,
            industry: text(fields, "industry")?,
            country: text(fields, "country")?,
            website: text(fields, "website")?,
        },
        market_metrics: MarketMetrics {
            current_price: first_float(fields, &["currentPrice", "regularMarketPrice"])?,
            currency: text(fields, "currency")?
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            market_cap,
            market_cap_formatted: market_cap.map(format_market_cap),
            enterprise_value: integer(fields, "enterpriseValue")?,
            volume: first_integer(fields, &["volume", "regularMarketVolume"])?,
            avg_volume: integer(fields, "averageVolume")?,
        },
        valuation_ratios: ValuationRatios {
            forward_pe: float(fields, "forwardPE")?,
            trailing_pe: float(fields, "trailingPE")?,
            price_to_book: float(fields, "priceToBook")?,
            price_to_sales: float(fields, "priceToSalesTrailing12Months")?,
            peg_ratio: first_float(fields, &["pegRatio", "trailingPegRatio"])?,
        },
        financial_health: FinancialHealth {
            dividend_yield: float(fields, "dividendYield")?,
            dividend_rate: float(fields, "dividendRate")?,
            profit_margin: float(fields, "profitMargins")?,
            operating_margin: float(fields, "operatingMargins")?,
            debt_to_equity: float(fields, "debtToEquity")?,
            return_on_equity: float(fields, "returnOnEquity")?,
            return_on_assets: float(fields, "returnOnAssets")?,
        },
        analyst_metrics: AnalystMetrics {
            recommendation: text(fields, "recommendationKey")?,
            recommendation_mean: float(fields, "recommendationMean")?,
            target_high_price: float(fields, "targetHighPrice")?,
            target_low_price: float(fields, "targetLowPrice")?,
            target_mean_price: float(fields, "targetMeanPrice")?,
            number_of_analyst_opinions: integer(fields, "numberOfAnalystOpinions")?,
        },
    })
}
