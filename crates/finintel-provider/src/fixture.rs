//! In-memory `MarketDataSource` serving canned responses.
//!
//! Symbols without a configured response return an empty field map and an
//! empty ownership snapshot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::json;

use crate::error::SourceError;
use crate::source::{FieldMap, MarketDataSource, OwnershipSnapshot};

#[derive(Default)]
pub struct StaticSource {
    info: DashMap<String, Result<FieldMap, SourceError>>,
    ownership: DashMap<String, Result<OwnershipSnapshot, SourceError>>,
    delay: Option<Duration>,
    info_calls: AtomicUsize,
    ownership_calls: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_info(self, symbol: &str, fields: FieldMap) -> Self {
        self.info.insert(symbol.to_string(), Ok(fields));
        self
    }

    pub fn with_info_error(self, symbol: &str, err: SourceError) -> Self {
        self.info.insert(symbol.to_string(), Err(err));
        self
    }

    pub fn with_ownership(self, symbol: &str, snapshot: OwnershipSnapshot) -> Self {
        self.ownership.insert(symbol.to_string(), Ok(snapshot));
        self
    }

    pub fn with_ownership_error(self, symbol: &str, err: SourceError) -> Self {
        self.ownership.insert(symbol.to_string(), Err(err));
        self
    }

    /// Full sample info plus known ownership for `symbol`.
    pub fn with_listed(self, symbol: &str, name: &str) -> Self {
        self.with_info(symbol, sample_info(name))
            .with_ownership(symbol, listed_ownership())
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn ownership_calls(&self) -> usize {
        self.ownership_calls.load(Ordering::SeqCst)
    }

    fn pause(&self) {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
    }
}

impl MarketDataSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn fetch_info(&self, symbol: &str) -> Result<FieldMap, SourceError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.pause();
        self.info
            .get(symbol)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| Ok(FieldMap::new()))
    }

    fn fetch_ownership(&self, symbol: &str) -> Result<OwnershipSnapshot, SourceError> {
        self.ownership_calls.fetch_add(1, Ordering::SeqCst);
        self.pause();
        self.ownership
            .get(symbol)
            .map(|entry| entry.value().clone())
            .unwrap_or(Ok(OwnershipSnapshot::default()))
    }
}

/// Ownership typical of a large listed company.
pub fn listed_ownership() -> OwnershipSnapshot {
    OwnershipSnapshot {
        institutional_holders: 10,
        major_holders: 4,
    }
}

/// A complete large-cap info response.
pub fn sample_info(name: &str) -> FieldMap {
    let value = json!({
        "longName": name,
        "shortName": name,
        "sector": "Technology",
        "industry": "Consumer Electronics",
        "country": "United States",
        "website": "https://www.example.com",
        "currency": "USD",
        "currentPrice": 189.84,
        "regularMarketPrice": 189.84,
        "previousClose": 188.5,
        "marketCap": 2_950_000_000_000_i64,
        "enterpriseValue": 2_990_000_000_000_i64,
        "volume": 52_000_000,
        "averageVolume": 58_000_000,
        "forwardPE": 28.4,
        "trailingPE": 31.2,
        "priceToBook": 47.1,
        "priceToSalesTrailing12Months": 7.6,
        "pegRatio": 2.9,
        "dividendYield": 0.0051,
        "dividendRate": 0.96,
        "profitMargins": 0.253,
        "operatingMargins": 0.301,
        "debtToEquity": 181.3,
        "returnOnEquity": 1.47,
        "returnOnAssets": 0.22,
        "recommendationKey": "buy",
        "recommendationMean": 2.0,
        "targetHighPrice": 250.0,
        "targetLowPrice": 160.0,
        "targetMeanPrice": 210.5,
        "numberOfAnalystOpinions": 38
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => FieldMap::new(),
    }
}
