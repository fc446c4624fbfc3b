//! Currency codes, rate tables and the conversion adapter that normalises
//! turnovers before they reach the evaluation engine.

mod convert;
mod fetch;
mod format;

pub use convert::{Conversion, ConversionError, CurrencyConverter, ManualRate, RateOrigin};
pub use fetch::{fetch_with_timeout, OpenErApiProvider, RateFetchError, RateProvider};
pub use format::{currency_symbol, format_amount, format_currency};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ISO-4217 style three letter code, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidCurrencyCode> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|byte| byte.is_ascii_alphabetic()) {
            Ok(Self(code))
        } else {
            Err(InvalidCurrencyCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = InvalidCurrencyCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = InvalidCurrencyCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a three letter currency code")]
pub struct InvalidCurrencyCode(pub String);

/// Amount tagged with its currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: f64, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }
}

/// Exchange rates quoted against `base`: one unit of `base` buys `rates[code]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub base: CurrencyCode,
    pub rates: BTreeMap<CurrencyCode, f64>,
    pub fetched_at: DateTime<Utc>,
    pub source: String,
}

impl RateTable {
    pub fn new(base: CurrencyCode, rates: BTreeMap<CurrencyCode, f64>, source: &str) -> Self {
        Self {
            base,
            rates,
            fetched_at: Utc::now(),
            source: source.to_string(),
        }
    }

    fn quote(&self, code: &CurrencyCode) -> Option<f64> {
        if *code == self.base {
            return Some(1.0);
        }
        self.rates
            .get(code)
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }

    /// Units of `to` per unit of `from`, crossing through the base currency.
    pub fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<f64> {
        let from_quote = self.quote(from)?;
        let to_quote = self.quote(to)?;
        Some(to_quote / from_quote)
    }
}
