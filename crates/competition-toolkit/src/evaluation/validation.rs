/// Rejected input. Every variant that concerns a single field names it so the
/// caller can point the user at the offending input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    MissingField { field: String },
    #[error("field `{field}` must be numeric (got `{value}`)")]
    NotNumeric { field: String, value: String },
    #[error("field `{field}` must be a finite number")]
    NotFinite { field: String },
    #[error("field `{field}` must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("field `{field}` must not be negative (got {value})")]
    Negative { field: String, value: f64 },
    #[error("field `{field}` must be one of {allowed} (got `{value}`)")]
    InvalidChoice {
        field: String,
        value: String,
        allowed: String,
    },
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("market shares add up to {total:.2}%, which exceeds 100%")]
    ShareTotalExceeded { total: f64 },
    #[error("market shares add up to zero and cannot be normalised")]
    ZeroShareTotal,
    #[error("field `{field}` needs at least {minimum} entries (got {found})")]
    TooFewEntries {
        field: String,
        minimum: usize,
        found: usize,
    },
    #[error("jurisdiction `{0}` is not registered")]
    UnknownJurisdiction(String),
    #[error("checklist question `{0}` is not registered")]
    UnknownQuestion(String),
    #[error("checklist question `{0}` was not answered")]
    UnansweredQuestion(String),
    #[error("field `{field}` is in {found}, expected {expected}")]
    CurrencyMismatch {
        field: String,
        expected: String,
        found: String,
    },
    #[error("page `{0}` does not exist")]
    UnknownPage(String),
}

impl ValidationError {
    /// Field the error refers to, when it concerns a single one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::NotNumeric { field, .. }
            | ValidationError::NotFinite { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Negative { field, .. }
            | ValidationError::InvalidChoice { field, .. }
            | ValidationError::WrongType { field, .. }
            | ValidationError::TooFewEntries { field, .. }
            | ValidationError::CurrencyMismatch { field, .. } => Some(field),
            ValidationError::UnknownQuestion(id) | ValidationError::UnansweredQuestion(id) => {
                Some(id)
            }
            _ => None,
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        ValidationError::MissingField {
            field: field.into(),
        }
    }
}

pub(crate) fn require_finite(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite {
            field: field.to_string(),
        })
    }
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<f64, ValidationError> {
    let value = require_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        });
    }
    Ok(value)
}

pub(crate) fn require_range(
    field: &str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    let value = require_finite(field, value)?;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(value)
}

/// Market share on the 0-100 scale.
pub(crate) fn require_share(field: &str, value: f64) -> Result<f64, ValidationError> {
    require_range(field, value, 0.0, 100.0)
}

/// Slack for share totals that drift past 100 through decimal input.
pub(crate) const SHARE_TOTAL_TOLERANCE: f64 = 1e-6;

pub(crate) fn require_share_total(shares: &[f64]) -> Result<f64, ValidationError> {
    let total: f64 = shares.iter().sum();
    if total > 100.0 + SHARE_TOTAL_TOLERANCE {
        return Err(ValidationError::ShareTotalExceeded { total });
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_bounds_are_inclusive() {
        assert_eq!(require_share("share", 0.0), Ok(0.0));
        assert_eq!(require_share("share", 100.0), Ok(100.0));
        assert!(matches!(
            require_share("firms[1].share", -0.5),
            Err(ValidationError::OutOfRange { field, .. }) if field == "firms[1].share"
        ));
        assert!(require_share("share", 100.01).is_err());
    }

    #[test]
    fn rejects_nan_and_infinity() {
        assert!(matches!(
            require_finite("turnover", f64::NAN),
            Err(ValidationError::NotFinite { .. })
        ));
        assert!(require_non_negative("turnover", f64::INFINITY).is_err());
    }

    #[test]
    fn share_total_tolerates_rounding_drift() {
        assert!(require_share_total(&[33.333_333_4, 33.333_333_3, 33.333_333_3]).is_ok());
        assert!(matches!(
            require_share_total(&[60.0, 50.0]),
            Err(ValidationError::ShareTotalExceeded { .. })
        ));
    }

    #[test]
    fn exposes_offending_field() {
        let error = ValidationError::missing("parties[0].turnover");
        assert_eq!(error.field(), Some("parties[0].turnover"));
        assert_eq!(error.to_string(), "missing required field `parties[0].turnover`");
        assert_eq!(ValidationError::ZeroShareTotal.field(), None);
    }
}
