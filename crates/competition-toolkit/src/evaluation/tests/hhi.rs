use super::common::*;
use crate::evaluation::{concentration_ratio, hhi_score, normalize_shares, ValidationError};
use crate::registry::Metric;

#[test]
fn four_firm_market_is_highly_concentrated() {
    let result = evaluate(&engine(), hhi(&[40.0, 30.0, 20.0, 10.0], false)).expect("evaluates");

    assert_eq!(result.numeric_score, Some(3000.0));
    assert_eq!(band_of(&result), "highly_concentrated");
    assert_eq!(result.label(), "Highly concentrated");

    let cr4 = result
        .components
        .iter()
        .find(|component| component.factor == "cr4")
        .expect("cr4 component");
    assert_eq!(cr4.score, 100.0);
}

#[test]
fn normalization_rescales_before_squaring() {
    let result = evaluate(&engine(), hhi(&[20.0, 15.0, 10.0, 5.0], true)).expect("evaluates");

    let score = result.numeric_score.expect("score");
    assert!((score - 3000.0).abs() < 1e-9, "score was {score}");
    assert_eq!(band_of(&result), "highly_concentrated");
}

#[test]
fn without_normalization_partial_shares_are_squared_as_given() {
    let result = evaluate(&engine(), hhi(&[20.0, 15.0, 10.0, 5.0], false)).expect("evaluates");

    assert_eq!(result.numeric_score, Some(750.0));
    assert_eq!(band_of(&result), "unconcentrated");
}

#[test]
fn band_edges_belong_to_the_upper_band() {
    let moderate =
        evaluate(&engine(), hhi(&[30.0, 20.0, 10.0, 5.0, 5.0, 5.0, 5.0], false)).expect("evaluates");
    assert_eq!(moderate.numeric_score, Some(1500.0));
    assert_eq!(band_of(&moderate), "moderately_concentrated");

    let high = evaluate(&engine(), hhi(&[50.0], false)).expect("evaluates");
    assert_eq!(high.numeric_score, Some(2500.0));
    assert_eq!(band_of(&high), "highly_concentrated");
}

#[test]
fn all_zero_shares_score_zero_unless_normalized() {
    let result = evaluate(&engine(), hhi(&[0.0, 0.0], false)).expect("evaluates");
    assert_eq!(result.numeric_score, Some(0.0));
    assert_eq!(band_of(&result), "unconcentrated");

    assert_eq!(
        evaluate(&engine(), hhi(&[0.0, 0.0], true)),
        Err(ValidationError::ZeroShareTotal)
    );
}

#[test]
fn rejects_shares_outside_the_percentage_scale() {
    assert!(matches!(
        evaluate(&engine(), hhi(&[40.0, -5.0], false)),
        Err(ValidationError::OutOfRange { field, .. }) if field == "firms[1].share"
    ));
    assert!(matches!(
        evaluate(&engine(), hhi(&[140.0], false)),
        Err(ValidationError::OutOfRange { .. })
    ));
    assert!(matches!(
        evaluate(&engine(), hhi(&[f64::NAN], false)),
        Err(ValidationError::NotFinite { .. })
    ));
}

#[test]
fn rejects_share_totals_above_one_hundred() {
    assert!(matches!(
        evaluate(&engine(), hhi(&[60.0, 50.0], true)),
        Err(ValidationError::ShareTotalExceeded { .. })
    ));
}

#[test]
fn rejects_empty_markets() {
    assert!(matches!(
        evaluate(&engine(), hhi(&[], false)),
        Err(ValidationError::TooFewEntries { minimum: 1, found: 0, .. })
    ));
}

#[test]
fn raising_any_share_never_lowers_the_index() {
    let engine = engine();
    let base = [25.0, 20.0, 15.0, 10.0];

    for index in 0..base.len() {
        let mut shares = base;
        let mut previous = evaluate(&engine, hhi(&shares, false))
            .expect("evaluates")
            .numeric_score
            .expect("score");

        while shares.iter().sum::<f64>() + 2.5 <= 100.0 {
            shares[index] += 2.5;
            let next = evaluate(&engine, hhi(&shares, false))
                .expect("evaluates")
                .numeric_score
                .expect("score");
            assert!(next >= previous, "{shares:?}: {next} < {previous}");
            previous = next;
        }
    }
}

#[test]
fn every_valid_market_lands_in_exactly_one_band() {
    let engine = engine();
    let table = engine
        .registry()
        .band_table("general", Metric::Hhi)
        .expect("hhi table");

    for leader in (0..=100).step_by(5) {
        let leader = leader as f64;
        let rest = (100.0 - leader) / 3.0;
        let result = evaluate(&engine, hhi(&[leader, rest, rest, rest], false)).expect("evaluates");
        let score = result.numeric_score.expect("score");

        let matching: Vec<_> = table
            .bands()
            .iter()
            .filter(|band| band.contains(score))
            .collect();
        assert_eq!(matching.len(), 1, "score {score}");
        assert_eq!(band_of(&result), matching[0].name);
    }
}

#[test]
fn scores_outside_registered_bands_are_undetermined() {
    let engine = engine_with(|document| {
        for band in document.bands.iter_mut().filter(|band| band.metric == Metric::Hhi) {
            if band.name == "unconcentrated" {
                band.lower_bound = 100.0;
            }
        }
    });

    let result = evaluate(&engine, hhi(&[5.0], false)).expect("evaluates");
    assert!(result.is_undetermined());
    assert_eq!(result.label(), "Undetermined");
    assert_eq!(result.numeric_score, Some(25.0));
}

#[test]
fn helpers_match_hand_calculations() {
    assert_eq!(hhi_score(&[50.0, 50.0]), 5000.0);
    assert_eq!(concentration_ratio(&[5.0, 30.0, 10.0, 20.0, 25.0], 4), 85.0);
    assert_eq!(
        normalize_shares(&[1.0, 3.0]).expect("normalizes"),
        vec![25.0, 75.0]
    );
}
