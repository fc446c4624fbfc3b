use crate::currency::{format_amount, format_currency};
use crate::registry::{Metric, ThresholdRegistry};

use super::domain::{MergerRequest, MetricInput, MetricValue, PartyRole, ScoreComponent};
use super::validation::{require_non_negative, ValidationError};
use super::Assessment;

/// Counts the threshold tests a transaction meets. The combined turnover of
/// all parties is checked against the global threshold; the larger of the
/// acquirer-side and target-side totals against the local one. Ties count.
/// A side with no parties contributes nothing to the totals.
pub(crate) fn assess(
    registry: &ThresholdRegistry,
    jurisdiction: &str,
    request: &MergerRequest,
) -> Result<Assessment, ValidationError> {
    let thresholds = registry
        .merger_thresholds(jurisdiction)
        .ok_or_else(|| ValidationError::UnknownJurisdiction(request.jurisdiction.clone()))?;

    if request.parties.is_empty() {
        return Err(ValidationError::missing("parties"));
    }

    let mut inputs = Vec::with_capacity(request.parties.len() * 2);
    let mut acquirer_total = 0.0;
    let mut target_total = 0.0;

    for (index, party) in request.parties.iter().enumerate() {
        let field = format!("parties[{index}].turnover");
        let turnover = party
            .turnover
            .as_ref()
            .ok_or_else(|| ValidationError::missing(field.clone()))?;
        let amount = require_non_negative(&field, turnover.amount)?;

        if turnover.currency != thresholds.currency {
            return Err(ValidationError::CurrencyMismatch {
                field,
                expected: thresholds.currency.to_string(),
                found: turnover.currency.to_string(),
            });
        }

        match party.role {
            PartyRole::Acquirer => acquirer_total += amount,
            PartyRole::Target => target_total += amount,
        }

        inputs.push(MetricInput::new(
            format!("parties[{index}].role"),
            MetricValue::Category(format!("{} ({})", party.role.label(), party.name)),
        ));
        inputs.push(MetricInput::new(field, MetricValue::Number(amount)));
        if let Some(conversion) = &party.conversion {
            inputs.push(MetricInput::new(
                format!("parties[{index}].reported_turnover"),
                MetricValue::Text(format!(
                    "{} {} at {} ({})",
                    format_amount(conversion.original.amount),
                    conversion.original.currency,
                    conversion.rate,
                    conversion.origin.label()
                )),
            ));
        }
    }

    let combined = acquirer_total + target_total;
    let local_figure = acquirer_total.max(target_total);
    let currency = &thresholds.currency;

    let global_met = combined >= thresholds.global_threshold;
    let local_met = local_figure >= thresholds.local_threshold;

    let components = vec![
        test_component(
            "global_turnover",
            global_met,
            format!(
                "combined turnover {} vs threshold {}",
                format_currency(combined, currency),
                format_currency(thresholds.global_threshold, currency)
            ),
        ),
        test_component(
            "local_turnover",
            local_met,
            format!(
                "largest party-side turnover {} vs threshold {}",
                format_currency(local_figure, currency),
                format_currency(thresholds.local_threshold, currency)
            ),
        ),
    ];

    let tests_met = u8::from(global_met) + u8::from(local_met);

    Ok(Assessment {
        metric: Metric::MergerOutcome,
        inputs,
        score: f64::from(tests_met),
        ceiling: Some(2.0),
        components,
        unresolved: None,
    })
}

fn test_component(factor: &str, met: bool, notes: String) -> ScoreComponent {
    ScoreComponent {
        factor: factor.to_string(),
        level: Some(if met { "met" } else { "not met" }.to_string()),
        score: if met { 1.0 } else { 0.0 },
        notes,
    }
}
