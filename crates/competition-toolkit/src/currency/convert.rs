use serde::{Deserialize, Serialize};

use super::{CurrencyCode, Money, RateTable};

/// Rate entered by hand; wins over any fetched table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: f64,
}

impl ManualRate {
    /// Units of `to` per unit of `from`, using the reciprocal for the reverse pair.
    pub fn rate_for(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<f64> {
        if self.from == *from && self.to == *to {
            Some(self.rate)
        } else if self.from == *to && self.to == *from {
            Some(1.0 / self.rate)
        } else {
            None
        }
    }
}

/// Where the rate used for a conversion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateOrigin {
    SameCurrency,
    Manual,
    Table,
}

impl RateOrigin {
    pub const fn label(self) -> &'static str {
        match self {
            RateOrigin::SameCurrency => "same currency",
            RateOrigin::Manual => "manual rate",
            RateOrigin::Table => "live rate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub original: Money,
    pub converted: Money,
    pub rate: f64,
    pub origin: RateOrigin,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("no exchange rate available for {from} -> {to}; supply a manual rate")]
    Unavailable {
        from: CurrencyCode,
        to: CurrencyCode,
    },
    #[error("exchange rate {rate} for {from} -> {to} must be positive and finite")]
    InvalidRate {
        from: CurrencyCode,
        to: CurrencyCode,
        rate: f64,
    },
    #[error("amount {amount} is not a finite number")]
    InvalidAmount { amount: f64 },
    #[error("currency {0} is not supported")]
    Unsupported(CurrencyCode),
}

/// Converts amounts between the configured currencies. Rates are applied at
/// full precision; rounding is left to presentation.
#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    supported: Vec<CurrencyCode>,
}

impl CurrencyConverter {
    pub fn new(supported: Vec<CurrencyCode>) -> Self {
        Self { supported }
    }

    pub fn supported(&self) -> &[CurrencyCode] {
        &self.supported
    }

    pub fn ensure_supported(&self, code: &CurrencyCode) -> Result<(), ConversionError> {
        if self.supported.contains(code) {
            Ok(())
        } else {
            Err(ConversionError::Unsupported(code.clone()))
        }
    }

    /// Rate for `from -> to`: identity for the same currency, then manual
    /// overrides, then the table. Never falls back to 1.0.
    pub fn resolve_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        table: Option<&RateTable>,
        overrides: &[ManualRate],
    ) -> Result<(f64, RateOrigin), ConversionError> {
        if from == to {
            return Ok((1.0, RateOrigin::SameCurrency));
        }

        if let Some(rate) = overrides
            .iter()
            .find_map(|manual| manual.rate_for(from, to))
        {
            return validate_rate(from, to, rate).map(|rate| (rate, RateOrigin::Manual));
        }

        match table.and_then(|table| table.rate(from, to)) {
            Some(rate) => validate_rate(from, to, rate).map(|rate| (rate, RateOrigin::Table)),
            None => Err(ConversionError::Unavailable {
                from: from.clone(),
                to: to.clone(),
            }),
        }
    }

    pub fn convert(
        &self,
        money: &Money,
        target: &CurrencyCode,
        table: Option<&RateTable>,
        overrides: &[ManualRate],
    ) -> Result<Conversion, ConversionError> {
        if !money.amount.is_finite() {
            return Err(ConversionError::InvalidAmount {
                amount: money.amount,
            });
        }
        self.ensure_supported(&money.currency)?;
        self.ensure_supported(target)?;

        let (rate, origin) = self.resolve_rate(&money.currency, target, table, overrides)?;
        Ok(Conversion {
            original: money.clone(),
            converted: Money::new(money.amount * rate, target.clone()),
            rate,
            origin,
        })
    }

    /// True when `overrides` alone can convert `from -> to`.
    pub fn covered_without_table(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        overrides: &[ManualRate],
    ) -> bool {
        from == to
            || overrides
                .iter()
                .any(|manual| manual.rate_for(from, to).is_some())
    }
}

fn validate_rate(from: &CurrencyCode, to: &CurrencyCode, rate: f64) -> Result<f64, ConversionError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(ConversionError::InvalidRate {
            from: from.clone(),
            to: to.clone(),
            rate,
        })
    }
}
