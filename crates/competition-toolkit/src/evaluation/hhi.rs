use crate::registry::Metric;

use super::domain::{HhiRequest, MetricInput, MetricValue, ScoreComponent};
use super::validation::{require_share, require_share_total, ValidationError};
use super::Assessment;

/// Sum of squared shares on the 0-100 scale, so a monopoly scores 10,000.
pub fn hhi_score(shares: &[f64]) -> f64 {
    shares.iter().map(|share| share * share).sum()
}

/// Rescale shares so they add up to 100. An all-zero list cannot be rescaled.
pub fn normalize_shares(shares: &[f64]) -> Result<Vec<f64>, ValidationError> {
    let total: f64 = shares.iter().sum();
    if total <= 0.0 {
        return Err(ValidationError::ZeroShareTotal);
    }
    Ok(shares.iter().map(|share| share * 100.0 / total).collect())
}

/// Combined share of the `n` largest firms (CR-n).
pub fn concentration_ratio(shares: &[f64], n: usize) -> f64 {
    let mut sorted = shares.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted.iter().take(n).sum()
}

pub(crate) fn assess(request: &HhiRequest) -> Result<Assessment, ValidationError> {
    if request.firms.is_empty() {
        return Err(ValidationError::TooFewEntries {
            field: "firms".to_string(),
            minimum: 1,
            found: 0,
        });
    }

    let mut shares = Vec::with_capacity(request.firms.len());
    for (index, firm) in request.firms.iter().enumerate() {
        shares.push(require_share(&format!("firms[{index}].share"), firm.share)?);
    }
    let reported_total = require_share_total(&shares)?;

    let mut inputs = vec![
        MetricInput::new("shares", MetricValue::Numbers(shares.clone())),
        MetricInput::new("normalize", MetricValue::Flag(request.normalize)),
    ];

    let shares = if request.normalize {
        normalize_shares(&shares)?
    } else {
        shares
    };

    let mut components: Vec<ScoreComponent> = request
        .firms
        .iter()
        .zip(&shares)
        .map(|(firm, share)| ScoreComponent {
            factor: firm.name.clone(),
            level: None,
            score: share * share,
            notes: format!("market share {share:.2}%"),
        })
        .collect();

    let cr4 = concentration_ratio(&shares, 4);
    components.push(ScoreComponent {
        factor: "cr4".to_string(),
        level: None,
        score: cr4,
        notes: format!("four largest firms hold {cr4:.2}% of the market"),
    });

    inputs.push(MetricInput::new(
        "reported_total",
        MetricValue::Number(reported_total),
    ));
    inputs.push(MetricInput::new(
        "firm_count",
        MetricValue::Number(request.firms.len() as f64),
    ));

    Ok(Assessment {
        metric: Metric::Hhi,
        inputs,
        score: hhi_score(&shares),
        ceiling: Some(10_000.0),
        components,
        unresolved: None,
    })
}
