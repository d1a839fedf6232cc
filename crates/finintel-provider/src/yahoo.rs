//! Yahoo Finance quoteSummary source (blocking).
//!
//! quoteSummary groups fields by module and wraps numbers as
//! `{"raw": 1.5, "fmt": "1.50"}`. Responses are flattened into a single
//! field map keyed like the provider's `info` view so the mapping layer
//! is provider-neutral.

use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::{header, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult, SourceError};
use crate::source::{FieldMap, MarketDataSource, OwnershipSnapshot};

const INFO_MODULES: &str =
    "price,summaryProfile,summaryDetail,defaultKeyStatistics,financialData,assetProfile";
const OWNERSHIP_MODULES: &str = "institutionOwnership,majorHoldersBreakdown";

const MAJOR_HOLDER_FIELDS: [&str; 4] = [
    "insidersPercentHeld",
    "institutionsPercentHeld",
    "institutionsFloatPercentHeld",
    "institutionsCount",
];

#[derive(Debug, Clone)]
struct Crumb {
    cookie: String,
    crumb: String,
}

pub struct YahooSource {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Mutex<Option<Crumb>>,
}

impl YahooSource {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ProviderError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url.clone(),
            crumb: Mutex::new(None),
        })
    }

    fn ensure_crumb(&self) -> Result<Crumb, SourceError> {
        if let Some(crumb) = self.crumb.lock().as_ref() {
            return Ok(crumb.clone());
        }

        let response = self
            .client
            .get(&self.cookie_url)
            .send()
            .map_err(|e| SourceError::Transport(format!("Failed to get cookie: {e}")))?;
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| SourceError::Auth("Failed to parse Yahoo cookie".to_string()))?;

        let crumb = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .header(header::COOKIE, &cookie)
            .send()
            .and_then(|r| r.text())
            .map_err(|e| SourceError::Transport(format!("Failed to get crumb: {e}")))?;

        let crumb = Crumb { cookie, crumb };
        *self.crumb.lock() = Some(crumb.clone());
        debug!("Yahoo crumb refreshed");
        Ok(crumb)
    }

    fn quote_summary(&self, symbol: &str, modules: &str) -> Result<Option<Value>, SourceError> {
        let crumb = self.ensure_crumb()?;
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("modules", modules), ("crumb", crumb.crumb.as_str())])
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                *self.crumb.lock() = None;
                Err(SourceError::Auth("Yahoo authentication expired".to_string()))
            }
            // Hollow answers are left for failure detection to classify.
            StatusCode::NOT_FOUND | StatusCode::TOO_MANY_REQUESTS => {
                warn!(symbol, status = response.status().as_u16(), "Yahoo returned no data");
                Ok(None)
            }
            status if !status.is_success() => Err(SourceError::Http {
                status: status.as_u16(),
            }),
            _ => {
                let body: Value = response
                    .json()
                    .map_err(|e| SourceError::Decode(e.to_string()))?;
                Ok(first_result(body))
            }
        }
    }
}

fn first_result(body: Value) -> Option<Value> {
    body.get("quoteSummary")?
        .get("result")?
        .as_array()?
        .first()
        .cloned()
}

/// Unwrap `{"raw": x, "fmt": ..}` wrappers; drop empty objects.
fn unwrap_value(value: &Value) -> Option<Value> {
    match value {
        Value::Object(obj) => match obj.get("raw") {
            Some(raw) => Some(raw.clone()),
            None if obj.is_empty() => None,
            None => Some(value.clone()),
        },
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// Merge every module of a quoteSummary result into one field map.
///
/// Earlier modules win when two modules share a key. `maxAge` bookkeeping
/// fields are skipped.
pub fn flatten_quote_summary(result: &Value) -> FieldMap {
    let mut fields = FieldMap::new();
    let Some(modules) = result.as_object() else {
        return fields;
    };
    for module in modules.values() {
        let Some(entries) = module.as_object() else {
            continue;
        };
        for (key, value) in entries {
            if key == "maxAge" || fields.contains_key(key) {
                continue;
            }
            if let Some(v) = unwrap_value(value) {
                fields.insert(key.clone(), v);
            }
        }
    }
    fields
}

/// Count ownership rows in an ownership quoteSummary result.
pub fn ownership_from_summary(result: &Value) -> OwnershipSnapshot {
    let institutional_holders = result
        .pointer("/institutionOwnership/ownershipList")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let major_holders = result
        .get("majorHoldersBreakdown")
        .map_or(0, |breakdown| {
            MAJOR_HOLDER_FIELDS
                .iter()
                .filter(|k| breakdown.get(**k).and_then(unwrap_value).is_some())
                .count()
        });
    OwnershipSnapshot {
        institutional_holders,
        major_holders,
    }
}

impl MarketDataSource for YahooSource {
    fn name(&self) -> &'static str {
        "yahoo_finance"
    }

    fn fetch_info(&self, symbol: &str) -> Result<FieldMap, SourceError> {
        Ok(self
            .quote_summary(symbol, INFO_MODULES)?
            .map(|result| flatten_quote_summary(&result))
            .unwrap_or_default())
    }

    fn fetch_ownership(&self, symbol: &str) -> Result<OwnershipSnapshot, SourceError> {
        Ok(self
            .quote_summary(symbol, OWNERSHIP_MODULES)?
            .map(|result| ownership_from_summary(&result))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_unwraps_raw_and_merges_modules() {
        let result = json!({
            "price": {
                "maxAge": 1,
                "longName": "Apple Inc.",
                "regularMarketPrice": {"raw": 189.84, "fmt": "189.84"},
                "marketCap": {"raw": 2950000000000_i64, "fmt": "2.95T"}
            },
            "summaryDetail": {
                "trailingPE": {"raw": 31.2, "fmt": "31.20"},
                "marketCap": {"raw": 1, "fmt": "1"},
                "dividendYield": {}
            },
            "financialData": {
                "currentPrice": {"raw": 189.9},
                "recommendationKey": "buy"
            }
        });
        let fields = flatten_quote_summary(&result);

        assert_eq!(fields["longName"], "Apple Inc.");
        assert_eq!(fields["regularMarketPrice"], 189.84);
        assert_eq!(fields["marketCap"], 2950000000000_i64);
        assert_eq!(fields["trailingPE"], 31.2);
        assert_eq!(fields["currentPrice"], 189.9);
        assert_eq!(fields["recommendationKey"], "buy");
        assert!(!fields.contains_key("maxAge"));
        assert!(!fields.contains_key("dividendYield"));
    }

    #[test]
    fn test_first_result_handles_missing() {
        assert!(first_result(json!({"quoteSummary": {"result": []}})).is_none());
        assert!(first_result(json!({"error": "x"})).is_none());
        assert!(first_result(json!({"quoteSummary": {"result": [{"price": {}}]}})).is_some());
    }

    #[test]
    fn test_ownership_counts() {
        let result = json!({
            "institutionOwnership": {"ownershipList": [{"organization": "A"}, {"organization": "B"}]},
            "majorHoldersBreakdown": {
                "insidersPercentHeld": {"raw": 0.01},
                "institutionsPercentHeld": {"raw": 0.6},
                "institutionsCount": {}
            }
        });
        let snapshot = ownership_from_summary(&result);
        assert_eq!(snapshot.institutional_holders, 2);
        assert_eq!(snapshot.major_holders, 2);

        assert!(!ownership_from_summary(&json!({})).has_data());
    }
}
