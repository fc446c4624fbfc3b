use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::currency::{CurrencyCode, Money};
use crate::evaluation::{
    BarrierLevel, ChecklistAnswer, ChecklistRequest, Classification, DominanceRequest,
    EvaluationEngine, EvaluationRequest, EvaluationResult, FirmShare, HhiRequest, MergerParty,
    MergerRequest, PartyRole, ValidationError,
};
use crate::registry::{RegistryDocument, ThresholdRegistry};

pub(super) fn engine() -> EvaluationEngine {
    EvaluationEngine::new(Arc::new(ThresholdRegistry::standard()))
}

/// Engine over the standard document after `edit` has been applied.
pub(super) fn engine_with(edit: impl FnOnce(&mut RegistryDocument)) -> EvaluationEngine {
    let mut document = ThresholdRegistry::standard().document();
    edit(&mut document);
    let registry = ThresholdRegistry::from_document(document).expect("edited registry is valid");
    EvaluationEngine::new(Arc::new(registry))
}

pub(super) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn evaluate(
    engine: &EvaluationEngine,
    request: EvaluationRequest,
) -> Result<EvaluationResult, ValidationError> {
    engine.evaluate_at(&request, fixed_time())
}

pub(super) fn band_of(result: &EvaluationResult) -> &str {
    match &result.classification {
        Classification::Band { band, .. } => band,
        Classification::Undetermined { reason } => panic!("expected a band, got undetermined: {reason}"),
    }
}

pub(super) fn try_amount(amount: f64) -> Money {
    Money::new(amount, CurrencyCode::parse("TRY").expect("valid code"))
}

pub(super) fn party(name: &str, role: PartyRole, turnover: Option<Money>) -> MergerParty {
    MergerParty {
        name: name.to_string(),
        role,
        turnover,
        conversion: None,
    }
}

pub(super) fn merger(acquirer: f64, target: f64) -> EvaluationRequest {
    EvaluationRequest::Merger(MergerRequest {
        jurisdiction: "turkish".to_string(),
        parties: vec![
            party("Anatolia Foods", PartyRole::Acquirer, Some(try_amount(acquirer))),
            party("Bosphorus Snacks", PartyRole::Target, Some(try_amount(target))),
        ],
    })
}

pub(super) fn hhi(shares: &[f64], normalize: bool) -> EvaluationRequest {
    EvaluationRequest::Hhi(HhiRequest {
        jurisdiction: "general".to_string(),
        firms: shares
            .iter()
            .enumerate()
            .map(|(index, share)| FirmShare {
                name: format!("Firm {}", index + 1),
                share: *share,
            })
            .collect(),
        normalize,
    })
}

pub(super) const QUESTION_IDS: [&str; 10] = [
    "pricing_practices",
    "market_sharing",
    "bid_rigging",
    "information_exchange",
    "exclusive_dealing",
    "tying_bundling",
    "predatory_pricing",
    "refusal_to_deal",
    "discriminatory_pricing",
    "resale_price_maintenance",
];

/// Every question answered `default`, then `overrides` applied.
pub(super) fn checklist(
    default: ChecklistAnswer,
    overrides: &[(&str, ChecklistAnswer)],
) -> ChecklistRequest {
    let mut answers: std::collections::BTreeMap<String, ChecklistAnswer> = QUESTION_IDS
        .iter()
        .map(|id| (id.to_string(), default))
        .collect();
    for (id, answer) in overrides {
        answers.insert(id.to_string(), *answer);
    }
    ChecklistRequest {
        jurisdiction: "general".to_string(),
        answers,
    }
}

pub(super) fn dominance(market_share: f64) -> DominanceRequest {
    DominanceRequest {
        jurisdiction: "general".to_string(),
        market_share: Some(market_share),
        market_hhi: None,
        rival_shares: Vec::new(),
        vertical_integration: false,
        network_effects: false,
        entry_barriers: BarrierLevel::Medium,
    }
}
