use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::currency::{CurrencyCode, Money};
use crate::evaluation::{
    BarrierLevel, ChecklistAnswer, ChecklistRequest, DominanceRequest, EvaluationRequest,
    FirmShare, HhiRequest, MergerParty, MergerRequest, PartyRole, ValidationError,
};
use crate::registry::GENERAL_JURISDICTION;

use super::MIN_HHI_FIRMS;

const DEFAULT_MERGER_JURISDICTION: &str = "turkish";

pub(super) fn merger(
    form: &Map<String, Value>,
    default_currency: &CurrencyCode,
) -> Result<EvaluationRequest, ValidationError> {
    let jurisdiction = text_or(form, "jurisdiction", DEFAULT_MERGER_JURISDICTION)?;
    let form_currency = match optional(form, "currency") {
        Some(value) => currency("currency", value)?,
        None => default_currency.clone(),
    };

    let parties = list(form, "parties")?;
    let mut parsed = Vec::with_capacity(parties.len());
    for (index, entry) in parties.iter().enumerate() {
        let prefix = format!("parties[{index}]");
        let party = object(&prefix, entry)?;

        let name = match optional(party, "name") {
            Some(value) => text(&format!("{prefix}.name"), value)?,
            None => format!("Party {}", index + 1),
        };
        let role = choice::<PartyRole>(
            &format!("{prefix}.role"),
            required(party, &prefix, "role")?,
            "acquirer, target",
        )?;
        let currency = match optional(party, "currency") {
            Some(value) => currency(&format!("{prefix}.currency"), value)?,
            None => form_currency.clone(),
        };
        let turnover_field = format!("{prefix}.turnover");
        let amount = number(&turnover_field, required(party, &prefix, "turnover")?)?;

        parsed.push(MergerParty {
            name,
            role,
            turnover: Some(Money::new(amount, currency)),
            conversion: None,
        });
    }

    Ok(EvaluationRequest::Merger(MergerRequest {
        jurisdiction,
        parties: parsed,
    }))
}

pub(super) fn hhi(form: &Map<String, Value>) -> Result<EvaluationRequest, ValidationError> {
    let firms = list(form, "firms")?;
    if firms.len() < MIN_HHI_FIRMS {
        return Err(ValidationError::TooFewEntries {
            field: "firms".to_string(),
            minimum: MIN_HHI_FIRMS,
            found: firms.len(),
        });
    }

    let mut parsed = Vec::with_capacity(firms.len());
    for (index, entry) in firms.iter().enumerate() {
        let prefix = format!("firms[{index}]");
        let firm = object(&prefix, entry)?;
        let name = match optional(firm, "name") {
            Some(value) => text(&format!("{prefix}.name"), value)?,
            None => format!("Firm {}", index + 1),
        };
        let share = number(&format!("{prefix}.share"), required(firm, &prefix, "share")?)?;
        parsed.push(FirmShare { name, share });
    }

    Ok(EvaluationRequest::Hhi(HhiRequest {
        jurisdiction: text_or(form, "jurisdiction", GENERAL_JURISDICTION)?,
        firms: parsed,
        normalize: flag_or(form, "normalize", false)?,
    }))
}

pub(super) fn checklist(form: &Map<String, Value>) -> Result<EvaluationRequest, ValidationError> {
    let raw = optional(form, "answers").ok_or_else(|| ValidationError::missing("answers"))?;
    let answers = object("answers", raw)?;

    let mut parsed = BTreeMap::new();
    for (id, value) in answers {
        let answer = choice::<ChecklistAnswer>(&format!("answers.{id}"), value, "no, sometimes, yes")?;
        parsed.insert(id.clone(), answer);
    }

    Ok(EvaluationRequest::Checklist(ChecklistRequest {
        jurisdiction: text_or(form, "jurisdiction", GENERAL_JURISDICTION)?,
        answers: parsed,
    }))
}

pub(super) fn dominance(form: &Map<String, Value>) -> Result<EvaluationRequest, ValidationError> {
    let market_share = number(
        "market_share",
        optional(form, "market_share").ok_or_else(|| ValidationError::missing("market_share"))?,
    )?;
    let market_hhi = optional(form, "market_hhi")
        .map(|value| number("market_hhi", value))
        .transpose()?;

    let rival_shares = match optional(form, "rival_shares") {
        Some(Value::Array(values)) => values
            .iter()
            .enumerate()
            .map(|(index, value)| number(&format!("rival_shares[{index}]"), value))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ValidationError::WrongType {
                field: "rival_shares".to_string(),
                expected: "a list of percentages",
            })
        }
        None => Vec::new(),
    };

    let entry_barriers = match optional(form, "entry_barriers") {
        Some(value) => choice::<BarrierLevel>("entry_barriers", value, "low, medium, high")?,
        None => BarrierLevel::default(),
    };

    Ok(EvaluationRequest::Dominance(DominanceRequest {
        jurisdiction: text_or(form, "jurisdiction", GENERAL_JURISDICTION)?,
        market_share: Some(market_share),
        market_hhi,
        rival_shares,
        vertical_integration: flag_or(form, "vertical_integration", false)?,
        network_effects: flag_or(form, "network_effects", false)?,
        entry_barriers,
    }))
}

/// Present and non-null; blank strings count as absent.
fn optional<'a>(form: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match form.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn required<'a>(
    form: &'a Map<String, Value>,
    prefix: &str,
    key: &str,
) -> Result<&'a Value, ValidationError> {
    optional(form, key).ok_or_else(|| ValidationError::missing(format!("{prefix}.{key}")))
}

fn list<'a>(form: &'a Map<String, Value>, key: &str) -> Result<&'a Vec<Value>, ValidationError> {
    match optional(form, key) {
        Some(Value::Array(values)) => Ok(values),
        Some(_) => Err(ValidationError::WrongType {
            field: key.to_string(),
            expected: "a list",
        }),
        None => Err(ValidationError::missing(key)),
    }
}

fn object<'a>(field: &str, value: &'a Value) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::WrongType {
        field: field.to_string(),
        expected: "an object",
    })
}

/// Numbers may arrive as JSON numbers or as strings such as "1,250.5".
fn number(field: &str, value: &Value) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text
            .trim()
            .replace([',', '_'], "")
            .parse::<f64>()
            .ok(),
        _ => None,
    };

    match parsed {
        Some(number) if number.is_finite() => Ok(number),
        Some(_) => Err(ValidationError::NotFinite {
            field: field.to_string(),
        }),
        None => Err(ValidationError::NotNumeric {
            field: field.to_string(),
            value: display(value),
        }),
    }
}

fn text(field: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(text) => Ok(text.trim().to_string()),
        _ => Err(ValidationError::WrongType {
            field: field.to_string(),
            expected: "text",
        }),
    }
}

fn text_or(form: &Map<String, Value>, key: &str, default: &str) -> Result<String, ValidationError> {
    match optional(form, key) {
        Some(value) => text(key, value),
        None => Ok(default.to_string()),
    }
}

fn flag_or(form: &Map<String, Value>, key: &str, default: bool) -> Result<bool, ValidationError> {
    let Some(value) = optional(form, key) else {
        return Ok(default);
    };
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ValidationError::InvalidChoice {
                field: key.to_string(),
                value: text.clone(),
                allowed: "yes, no".to_string(),
            }),
        },
        other => Err(ValidationError::WrongType {
            field: key.to_string(),
            expected: if other.is_number() { "yes or no, not a number" } else { "yes or no" },
        }),
    }
}

fn choice<T: FromStr>(field: &str, value: &Value, allowed: &str) -> Result<T, ValidationError> {
    let raw = value.as_str().ok_or_else(|| ValidationError::WrongType {
        field: field.to_string(),
        expected: "text",
    })?;
    raw.parse::<T>().map_err(|_| ValidationError::InvalidChoice {
        field: field.to_string(),
        value: raw.to_string(),
        allowed: allowed.to_string(),
    })
}

fn currency(field: &str, value: &Value) -> Result<CurrencyCode, ValidationError> {
    let raw = text(field, value)?;
    CurrencyCode::parse(&raw).map_err(|_| ValidationError::InvalidChoice {
        field: field.to_string(),
        value: raw,
        allowed: "a three letter currency code".to_string(),
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
