//! Silent-failure detection.
//!
//! Upstream providers often answer throttled or unknown requests with a
//! successful but hollow payload. Checks run in a fixed order and the
//! first failing check decides the outcome:
//! 1. fewer than `MIN_RESPONSE_FIELDS` non-null fields: `API_THROTTLE`
//! 2. no price field of any kind: `INVALID_TICKER`
//! 3. a present field of the wrong type: `UNKNOWN_ERROR`
//! 4. record fails the sufficiency contract: `INSUFFICIENT_DATA`
//!
//! Transport failures never reach this module; they are `NETWORK_ERROR`.

use chrono::{DateTime, Utc};
use finintel_core::{NormalizedRecord, TickerSymbol};
use finintel_telemetry::Metrics;
use serde_json::Value;
use tracing::warn;

use crate::error::RetrievalError;
use crate::normalize::normalize;
use crate::source::FieldMap;

pub const MIN_RESPONSE_FIELDS: usize = 5;

/// Any one of these marks the response as describing a priced instrument.
pub const PRICE_FIELDS: [&str; 3] = ["regularMarketPrice", "currentPrice", "previousClose"];

fn present(fields: &FieldMap, key: &str) -> bool {
    fields.get(key).is_some_and(|v| !v.is_null())
}

/// Classify an upstream response, producing a record only when it is usable.
pub fn classify(
    ticker: &TickerSymbol,
    data_source: &str,
    fields: &FieldMap,
    retrieved_at: DateTime<Utc>,
) -> Result<NormalizedRecord, RetrievalError> {
    let result = run_checks(ticker, data_source, fields, retrieved_at);
    if let Err(e) = &result {
        Metrics::silent_failure(e.code());
        warn!(ticker = %ticker, code = e.code(), error = %e, "Upstream response rejected");
    }
    result
}

fn run_checks(
    ticker: &TickerSymbol,
    data_source: &str,
    fields: &FieldMap,
    retrieved_at: DateTime<Utc>,
) -> Result<NormalizedRecord, RetrievalError> {
    let field_count = fields.values().filter(|v| !matches!(v, Value::Null)).count();
    if field_count < MIN_RESPONSE_FIELDS {
        return Err(RetrievalError::ApiThrottle { field_count });
    }

    if !PRICE_FIELDS.iter().any(|key| present(fields, key)) {
        return Err(RetrievalError::InvalidTicker);
    }

    let record = normalize(ticker, data_source, fields, retrieved_at)?;

    record
        .check_sufficiency()
        .map_err(|reason| RetrievalError::InsufficientData { reason })?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::sample_info;
    use serde_json::json;

    fn ticker(s: &str) -> TickerSymbol {
        TickerSymbol::parse(s).unwrap()
    }

    fn strip(mut fields: FieldMap, keys: &[&str]) -> FieldMap {
        for k in keys {
            fields.remove(*k);
        }
        fields
    }

    #[test]
    fn test_complete_response_passes() {
        let record = classify(&ticker("AAPL"), "static", &sample_info("Apple Inc."), Utc::now())
            .unwrap();
        assert_eq!(record.metadata.ticker, "AAPL");
    }

    #[test]
    fn test_three_fields_is_throttle() {
        let mut fields = FieldMap::new();
        fields.insert("symbol".into(), json!("XYZ"));
        fields.insert("quoteType".into(), json!("EQUITY"));
        fields.insert("regularMarketPrice".into(), json!(12.0));

        let err = classify(&ticker("XYZ"), "static", &fields, Utc::now()).unwrap_err();
        assert_eq!(err, RetrievalError::ApiThrottle { field_count: 3 });
        assert_eq!(err.code(), "API_THROTTLE");
    }

    #[test]
    fn test_empty_response_is_throttle() {
        let err = classify(&ticker("XYZ"), "static", &FieldMap::new(), Utc::now()).unwrap_err();
        assert_eq!(err.code(), "API_THROTTLE");
    }

    #[test]
    fn test_null_fields_do_not_count() {
        let mut fields = FieldMap::new();
        for k in ["a", "b", "c", "d", "e", "f"] {
            fields.insert(k.into(), Value::Null);
        }
        fields.insert("currentPrice".into(), json!(1.0));
        let err = classify(&ticker("XYZ"), "static", &fields, Utc::now()).unwrap_err();
        assert_eq!(err, RetrievalError::ApiThrottle { field_count: 1 });
    }

    #[test]
    fn test_no_price_is_invalid_ticker() {
        let fields = strip(
            sample_info("Ghost Corp"),
            &["currentPrice", "regularMarketPrice", "previousClose"],
        );
        let err = classify(&ticker("GHST"), "static", &fields, Utc::now()).unwrap_err();
        assert_eq!(err, RetrievalError::InvalidTicker);
    }

    #[test]
    fn test_single_ratio_is_insufficient() {
        let fields = strip(
            sample_info("Thin Data Inc."),
            &["forwardPE", "priceToBook", "priceToSalesTrailing12Months", "pegRatio"],
        );
        let err = classify(&ticker("THIN"), "static", &fields, Utc::now()).unwrap_err();
        match err {
            RetrievalError::InsufficientData { reason } => {
                assert!(reason.contains("(1/5 ratios)"), "{reason}")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_field_is_unknown_error() {
        let mut fields = sample_info("Apple Inc.");
        fields.insert("marketCap".into(), json!({"raw": 1}));
        let err = classify(&ticker("AAPL"), "static", &fields, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_ERROR");
    }

    #[test]
    fn test_throttle_checked_before_price() {
        let mut fields = FieldMap::new();
        fields.insert("symbol".into(), json!("XYZ"));
        let err = classify(&ticker("XYZ"), "static", &fields, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "API_THROTTLE");
    }
}
