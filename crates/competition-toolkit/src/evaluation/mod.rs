//! Pure evaluation engine. Each calculator turns a typed request into a score
//! plus an audit trail, and the score is classified against the registry's
//! bands. Nothing here performs I/O.

mod checklist;
mod domain;
mod dominance;
mod hhi;
mod merger;
mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    BarrierLevel, CalculationMode, ChecklistAnswer, ChecklistRequest, Classification,
    DominanceRequest, EvaluationRequest, EvaluationResult, FirmShare, HhiRequest, MergerParty,
    MergerRequest, MetricInput, MetricValue, PartyRole, ScoreComponent,
};
pub use hhi::{concentration_ratio, hhi_score, normalize_shares};
pub use validation::ValidationError;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::registry::{normalize_jurisdiction, Metric, ThresholdRegistry};

/// Intermediate output of a calculator before classification.
pub(crate) struct Assessment {
    pub metric: Metric,
    pub inputs: Vec<MetricInput>,
    pub score: f64,
    pub ceiling: Option<f64>,
    pub components: Vec<ScoreComponent>,
    /// Set when part of the score could not be placed in a band.
    pub unresolved: Option<String>,
}

/// Stateless evaluator over a shared, read-only registry.
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    registry: Arc<ThresholdRegistry>,
}

impl EvaluationEngine {
    pub fn new(registry: Arc<ThresholdRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ThresholdRegistry {
        &self.registry
    }

    pub fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult, ValidationError> {
        self.evaluate_at(request, Utc::now())
    }

    pub fn evaluate_at(
        &self,
        request: &EvaluationRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<EvaluationResult, ValidationError> {
        let jurisdiction = normalize_jurisdiction(request.jurisdiction());
        if !self.registry.knows_jurisdiction(&jurisdiction) {
            return Err(ValidationError::UnknownJurisdiction(
                request.jurisdiction().to_string(),
            ));
        }

        let assessment = match request {
            EvaluationRequest::Merger(request) => {
                merger::assess(&self.registry, &jurisdiction, request)?
            }
            EvaluationRequest::Hhi(request) => hhi::assess(request)?,
            EvaluationRequest::Checklist(request) => checklist::assess(&self.registry, request)?,
            EvaluationRequest::Dominance(request) => {
                dominance::assess(&self.registry, &jurisdiction, request)?
            }
        };

        let classification = match &assessment.unresolved {
            Some(reason) => Classification::Undetermined {
                reason: reason.clone(),
            },
            None => self.classify(&jurisdiction, assessment.metric, assessment.score),
        };

        Ok(EvaluationResult {
            mode: request.mode(),
            jurisdiction,
            registry_version: self.registry.version().to_string(),
            inputs: assessment.inputs,
            classification,
            numeric_score: Some(assessment.score),
            score_ceiling: assessment.ceiling,
            components: assessment.components,
            timestamp,
        })
    }

    /// Map `value` onto the single band that contains it.
    pub fn classify(&self, jurisdiction: &str, metric: Metric, value: f64) -> Classification {
        let Some(table) = self.registry.band_table(jurisdiction, metric) else {
            return Classification::Undetermined {
                reason: format!("no {metric} bands registered for {jurisdiction}"),
            };
        };

        match table.classify(value) {
            Some(band) => Classification::Band {
                band: band.name.clone(),
                label: band.label.clone(),
                guidance: band.guidance.clone(),
            },
            None => Classification::Undetermined {
                reason: format!("{metric} value {value} falls outside every registered band"),
            },
        }
    }
}

impl Default for EvaluationEngine {
    fn default() -> Self {
        Self::new(Arc::new(ThresholdRegistry::standard()))
    }
}
