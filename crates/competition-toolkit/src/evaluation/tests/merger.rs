use super::common::*;
use crate::currency::{Conversion, CurrencyCode, Money, RateOrigin};
use crate::evaluation::{
    CalculationMode, EvaluationRequest, MergerRequest, MetricValue, PartyRole, ValidationError,
};
use crate::registry::Metric;

#[test]
fn combined_turnover_above_global_threshold_requires_notification() {
    let result = evaluate(&engine(), merger(550_000_000.0, 50_000_000.0)).expect("evaluates");

    assert_eq!(result.mode, CalculationMode::Merger);
    assert_eq!(band_of(&result), "required");
    assert_eq!(result.label(), "Notification required");
    assert_eq!(result.numeric_score, Some(2.0));
    assert_eq!(result.timestamp, fixed_time());
}

#[test]
fn turnover_equal_to_global_threshold_counts_as_met() {
    let result = evaluate(&engine(), merger(450_000_000.0, 50_000_000.0)).expect("evaluates");

    let global = result
        .components
        .iter()
        .find(|component| component.factor == "global_turnover")
        .expect("global component");
    assert_eq!(global.level.as_deref(), Some("met"));
    assert_eq!(band_of(&result), "required");
}

#[test]
fn local_threshold_alone_is_enough() {
    let result = evaluate(&engine(), merger(40_000_000.0, 60_000_000.0)).expect("evaluates");

    assert_eq!(result.numeric_score, Some(1.0));
    assert_eq!(band_of(&result), "required");
}

#[test]
fn local_threshold_tie_counts_as_met() {
    let result = evaluate(&engine(), merger(30_000_000.0, 50_000_000.0)).expect("evaluates");

    let local = result
        .components
        .iter()
        .find(|component| component.factor == "local_turnover")
        .expect("local component");
    assert_eq!(local.score, 1.0);
}

#[test]
fn small_transactions_do_not_require_notification() {
    let result = evaluate(&engine(), merger(20_000_000.0, 10_000_000.0)).expect("evaluates");

    assert_eq!(result.numeric_score, Some(0.0));
    assert_eq!(band_of(&result), "not_required");
    assert_eq!(result.label(), "Notification not required");
}

#[test]
fn jurisdiction_can_require_both_tests() {
    let engine = engine_with(|document| {
        for band in document
            .bands
            .iter_mut()
            .filter(|band| band.metric == Metric::MergerOutcome)
        {
            if band.name == "not_required" {
                band.upper_bound = Some(2.0);
            } else {
                band.lower_bound = 2.0;
            }
        }
    });

    let result = evaluate(&engine, merger(40_000_000.0, 60_000_000.0)).expect("evaluates");
    assert_eq!(band_of(&result), "not_required");
}

#[test]
fn missing_turnover_names_the_field() {
    let request = EvaluationRequest::Merger(MergerRequest {
        jurisdiction: "turkish".to_string(),
        parties: vec![
            party("Anatolia Foods", PartyRole::Acquirer, Some(try_amount(1.0))),
            party("Bosphorus Snacks", PartyRole::Target, None),
        ],
    });

    let error = evaluate(&engine(), request).expect_err("missing turnover is rejected");
    assert_eq!(
        error,
        ValidationError::MissingField {
            field: "parties[1].turnover".to_string()
        }
    );
    assert_eq!(error.field(), Some("parties[1].turnover"));
}

#[test]
fn acquirer_alone_can_trigger_notification() {
    let request = EvaluationRequest::Merger(MergerRequest {
        jurisdiction: "turkish".to_string(),
        parties: vec![party(
            "Anatolia Foods",
            PartyRole::Acquirer,
            Some(try_amount(600_000_000.0)),
        )],
    });

    let result = evaluate(&engine(), request).expect("acquirer-only request evaluates");
    assert_eq!(result.label(), "Notification required");
    assert_eq!(result.numeric_score, Some(2.0));
}

#[test]
fn requires_at_least_one_party() {
    let request = EvaluationRequest::Merger(MergerRequest {
        jurisdiction: "turkish".to_string(),
        parties: Vec::new(),
    });

    assert_eq!(
        evaluate(&engine(), request),
        Err(ValidationError::MissingField {
            field: "parties".to_string()
        })
    );
}

#[test]
fn rejects_negative_turnover() {
    let result = evaluate(&engine(), merger(-1.0, 10.0));
    assert!(matches!(
        result,
        Err(ValidationError::Negative { field, .. }) if field == "parties[0].turnover"
    ));
}

#[test]
fn rejects_unconverted_turnover() {
    let request = EvaluationRequest::Merger(MergerRequest {
        jurisdiction: "turkish".to_string(),
        parties: vec![
            party(
                "Anatolia Foods",
                PartyRole::Acquirer,
                Some(Money::new(20_000_000.0, CurrencyCode::parse("EUR").expect("code"))),
            ),
            party("Bosphorus Snacks", PartyRole::Target, Some(try_amount(1.0))),
        ],
    });

    assert!(matches!(
        evaluate(&engine(), request),
        Err(ValidationError::CurrencyMismatch { expected, found, .. })
            if expected == "TRY" && found == "EUR"
    ));
}

#[test]
fn rejects_unknown_jurisdictions() {
    let mut request = merger(1.0, 1.0);
    if let EvaluationRequest::Merger(inner) = &mut request {
        inner.jurisdiction = "atlantis".to_string();
    }
    assert_eq!(
        evaluate(&engine(), request),
        Err(ValidationError::UnknownJurisdiction("atlantis".to_string()))
    );

    let mut general = merger(1.0, 1.0);
    if let EvaluationRequest::Merger(inner) = &mut general {
        inner.jurisdiction = "general".to_string();
    }
    assert!(matches!(
        evaluate(&engine(), general),
        Err(ValidationError::UnknownJurisdiction(_))
    ));
}

#[test]
fn records_reported_turnover_for_converted_parties() {
    let mut request = merger(600_000_000.0, 10_000_000.0);
    if let EvaluationRequest::Merger(inner) = &mut request {
        inner.parties[0].conversion = Some(Conversion {
            original: Money::new(20_000_000.0, CurrencyCode::parse("EUR").expect("code")),
            converted: try_amount(600_000_000.0),
            rate: 30.0,
            origin: RateOrigin::Manual,
        });
    }

    let result = evaluate(&engine(), request).expect("evaluates");
    match result.input("parties[0].reported_turnover") {
        Some(MetricValue::Text(text)) => {
            assert!(text.contains("EUR"), "{text}");
            assert!(text.contains("manual rate"), "{text}");
        }
        other => panic!("expected reported turnover, got {other:?}"),
    }
    assert_eq!(
        result.input("parties[0].turnover"),
        Some(&MetricValue::Number(600_000_000.0))
    );
}
