use crate::registry::{Metric, ThresholdRegistry};

use super::domain::{BarrierLevel, DominanceRequest, MetricInput, MetricValue, ScoreComponent};
use super::validation::{require_range, require_share, ValidationError};
use super::Assessment;

const MAX_HHI: f64 = 10_000.0;
const RIVALS_CONSIDERED: usize = 3;

/// Adds up the weighted dominance factors. Banded factors take their points
/// from the registry's factor tables; the total is clamped to the ceiling.
pub(crate) fn assess(
    registry: &ThresholdRegistry,
    jurisdiction: &str,
    request: &DominanceRequest,
) -> Result<Assessment, ValidationError> {
    let market_share = request
        .market_share
        .ok_or_else(|| ValidationError::missing("market_share"))?;
    let market_share = require_share("market_share", market_share)?;

    let market_hhi = match request.market_hhi {
        Some(hhi) => Some(require_range("market_hhi", hhi, 0.0, MAX_HHI)?),
        None => None,
    };

    let mut rivals = Vec::with_capacity(request.rival_shares.len());
    for (index, share) in request.rival_shares.iter().enumerate() {
        rivals.push(require_share(&format!("rival_shares[{index}]"), *share)?);
    }
    rivals.sort_by(|a, b| b.total_cmp(a));
    let top_rivals: f64 = rivals.iter().take(RIVALS_CONSIDERED).sum();

    let weights = registry.dominance_weights();
    let mut scorer = FactorScorer {
        registry,
        jurisdiction,
        components: Vec::new(),
        unresolved: None,
        ceiling: 0.0,
    };

    scorer.banded(
        "market_share",
        Metric::MarketShareFactor,
        market_share,
        format!("market share {market_share:.2}%"),
    );

    // An HHI of zero means "not supplied" on the form.
    match market_hhi {
        Some(hhi) if hhi > 0.0 => {
            scorer.banded("market_hhi", Metric::HhiFactor, hhi, format!("market HHI {hhi:.0}"))
        }
        _ => scorer.reserve(Metric::HhiFactor),
    }

    if rivals.is_empty() {
        scorer.reserve(Metric::RivalConcentrationFactor);
    } else {
        scorer.banded(
            "rival_concentration",
            Metric::RivalConcentrationFactor,
            top_rivals,
            format!("largest rivals hold {top_rivals:.2}% combined"),
        );
    }

    scorer.flag(
        "vertical_integration",
        request.vertical_integration,
        weights.vertical_integration,
        "vertically integrated",
    );
    scorer.flag(
        "network_effects",
        request.network_effects,
        weights.network_effects,
        "benefits from network effects",
    );

    let barrier_points = match request.entry_barriers {
        BarrierLevel::Low => weights.entry_barriers.low,
        BarrierLevel::Medium => weights.entry_barriers.medium,
        BarrierLevel::High => weights.entry_barriers.high,
    };
    scorer.ceiling += weights.entry_barriers.max();
    scorer.components.push(ScoreComponent {
        factor: "entry_barriers".to_string(),
        level: Some(request.entry_barriers.label().to_string()),
        score: barrier_points,
        notes: format!("{} barriers to entry", request.entry_barriers.label()),
    });

    let FactorScorer {
        components,
        unresolved,
        ceiling,
        ..
    } = scorer;

    let total: f64 = components.iter().map(|component| component.score).sum();

    let mut inputs = vec![
        MetricInput::new("market_share", MetricValue::Number(market_share)),
        MetricInput::new("rival_shares", MetricValue::Numbers(request.rival_shares.clone())),
        MetricInput::new(
            "vertical_integration",
            MetricValue::Flag(request.vertical_integration),
        ),
        MetricInput::new("network_effects", MetricValue::Flag(request.network_effects)),
        MetricInput::new(
            "entry_barriers",
            MetricValue::Category(request.entry_barriers.label().to_string()),
        ),
    ];
    if let Some(hhi) = market_hhi {
        inputs.insert(1, MetricInput::new("market_hhi", MetricValue::Number(hhi)));
    }

    Ok(Assessment {
        metric: Metric::DominanceRisk,
        inputs,
        score: total.clamp(0.0, ceiling),
        ceiling: Some(ceiling),
        components,
        unresolved,
    })
}

struct FactorScorer<'a> {
    registry: &'a ThresholdRegistry,
    jurisdiction: &'a str,
    components: Vec<ScoreComponent>,
    unresolved: Option<String>,
    ceiling: f64,
}

impl FactorScorer<'_> {
    fn table_max(&self, metric: Metric) -> f64 {
        self.registry
            .band_table(self.jurisdiction, metric)
            .map_or(0.0, |table| table.max_points())
    }

    /// Count a factor that was not supplied towards the ceiling only.
    fn reserve(&mut self, metric: Metric) {
        self.ceiling += self.table_max(metric);
    }

    fn banded(&mut self, factor: &str, metric: Metric, value: f64, notes: String) {
        self.reserve(metric);
        let band = self
            .registry
            .band_table(self.jurisdiction, metric)
            .and_then(|table| table.classify(value));

        match band {
            Some(band) => self.components.push(ScoreComponent {
                factor: factor.to_string(),
                level: Some(band.label.clone()),
                score: band.points,
                notes,
            }),
            None => {
                if self.unresolved.is_none() {
                    self.unresolved = Some(format!(
                        "{factor} value {value} falls outside every {metric} band"
                    ));
                }
            }
        }
    }

    fn flag(&mut self, factor: &str, present: bool, weight: f64, description: &str) {
        self.ceiling += weight;
        if present {
            self.components.push(ScoreComponent {
                factor: factor.to_string(),
                level: None,
                score: weight,
                notes: description.to_string(),
            });
        }
    }
}
