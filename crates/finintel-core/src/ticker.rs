//! Validated ticker symbol.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Accepted ticker grammar: 1-5 uppercase ASCII letters.
static TICKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{1,5}$").expect("ticker pattern is valid"));

/// Normalized instrument identifier.
///
/// Only constructible through [`TickerSymbol::parse`], so holding one means
/// the format check has passed. Adversarial screening happens in
/// [`crate::validator::validate`] before parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Trim, uppercase, then check the 1-5 letter grammar.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::Empty);
        }
        if !TICKER_PATTERN.is_match(&normalized) {
            return Err(ValidationError::InvalidFormat {
                input: crate::security::truncate_for_log(raw),
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TickerSymbol> for String {
    fn from(ticker: TickerSymbol) -> Self {
        ticker.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let t = TickerSymbol::parse("  aapl ").unwrap();
        assert_eq!(t.as_str(), "AAPL");
    }

    #[test]
    fn test_parse_rejects_bad_format() {
        assert_eq!(TickerSymbol::parse(""), Err(ValidationError::Empty));
        assert_eq!(TickerSymbol::parse("   "), Err(ValidationError::Empty));
        assert!(matches!(
            TickerSymbol::parse("TOOLONG"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(TickerSymbol::parse("BRK.B").is_err());
        assert!(TickerSymbol::parse("A1").is_err());
    }

    #[test]
    fn test_deserialize_enforces_grammar() {
        let t: TickerSymbol = serde_json::from_str("\"msft\"").unwrap();
        assert_eq!(t.as_str(), "MSFT");
        assert!(serde_json::from_str::<TickerSymbol>("\"123\"").is_err());
    }
}
