use super::{
    BarrierPoints, ChecklistQuestion, DominanceWeights, MergerThresholds, Metric,
    RegistryDocument, ThresholdBand, GENERAL_JURISDICTION,
};
use crate::currency::CurrencyCode;

pub const STANDARD_REGISTRY_VERSION: &str = "2025.1";

pub(super) fn document() -> RegistryDocument {
    RegistryDocument {
        version: STANDARD_REGISTRY_VERSION.to_string(),
        merger_thresholds: vec![MergerThresholds {
            jurisdiction: "turkish".to_string(),
            currency: CurrencyCode::try_from("TRY".to_string())
                .expect("TRY is a valid currency code"),
            global_threshold: 500_000_000.0,
            local_threshold: 50_000_000.0,
            description: "Turkish Competition Authority thresholds".to_string(),
        }],
        bands: bands(),
        dominance_weights: DominanceWeights {
            vertical_integration: 2.0,
            network_effects: 2.0,
            entry_barriers: BarrierPoints {
                low: 0.0,
                medium: 1.0,
                high: 2.0,
            },
        },
        checklist_questions: checklist_questions(),
    }
}

struct BandRow {
    metric: Metric,
    name: &'static str,
    lower: f64,
    upper: Option<f64>,
    upper_inclusive: bool,
    label: &'static str,
    points: f64,
    guidance: Option<&'static str>,
}

const BANDS: &[BandRow] = &[
    // One met test is enough for a notification.
    BandRow {
        metric: Metric::MergerOutcome,
        name: "not_required",
        lower: 0.0,
        upper: Some(1.0),
        upper_inclusive: false,
        label: "Notification not required",
        points: 0.0,
        guidance: Some("The transaction appears to be below the notification thresholds."),
    },
    BandRow {
        metric: Metric::MergerOutcome,
        name: "required",
        lower: 1.0,
        upper: None,
        upper_inclusive: false,
        label: "Notification required",
        points: 0.0,
        guidance: Some("The transaction appears to meet the notification thresholds."),
    },
    BandRow {
        metric: Metric::Hhi,
        name: "unconcentrated",
        lower: 0.0,
        upper: Some(1500.0),
        upper_inclusive: false,
        label: "Unconcentrated",
        points: 0.0,
        guidance: Some("Low concentration"),
    },
    BandRow {
        metric: Metric::Hhi,
        name: "moderately_concentrated",
        lower: 1500.0,
        upper: Some(2500.0),
        upper_inclusive: false,
        label: "Moderately concentrated",
        points: 0.0,
        guidance: Some("Moderate concentration"),
    },
    BandRow {
        metric: Metric::Hhi,
        name: "highly_concentrated",
        lower: 2500.0,
        upper: None,
        upper_inclusive: false,
        label: "Highly concentrated",
        points: 0.0,
        guidance: Some("High concentration"),
    },
    BandRow {
        metric: Metric::ChecklistRisk,
        name: "low",
        lower: 0.0,
        upper: Some(5.0),
        upper_inclusive: true,
        label: "Low risk",
        points: 0.0,
        guidance: Some("Low risk - Continue monitoring"),
    },
    BandRow {
        metric: Metric::ChecklistRisk,
        name: "medium",
        lower: 5.0,
        upper: Some(15.0),
        upper_inclusive: true,
        label: "Medium risk",
        points: 0.0,
        guidance: Some("Medium risk - Review practices"),
    },
    BandRow {
        metric: Metric::ChecklistRisk,
        name: "high",
        lower: 15.0,
        upper: None,
        upper_inclusive: false,
        label: "High risk",
        points: 0.0,
        guidance: Some("High risk - Seek legal counsel"),
    },
    BandRow {
        metric: Metric::DominanceRisk,
        name: "low",
        lower: 0.0,
        upper: Some(5.0),
        upper_inclusive: false,
        label: "Low risk",
        points: 0.0,
        guidance: Some("Low dominance concerns - continue monitoring"),
    },
    BandRow {
        metric: Metric::DominanceRisk,
        name: "medium",
        lower: 5.0,
        upper: Some(8.0),
        upper_inclusive: false,
        label: "Medium risk",
        points: 0.0,
        guidance: Some("Moderate dominance concerns - consider legal consultation"),
    },
    BandRow {
        metric: Metric::DominanceRisk,
        name: "high",
        lower: 8.0,
        upper: None,
        upper_inclusive: false,
        label: "High risk",
        points: 0.0,
        guidance: Some("Significant dominance concerns - immediate legal review recommended"),
    },
    BandRow {
        metric: Metric::MarketShareFactor,
        name: "low",
        lower: 0.0,
        upper: Some(30.0),
        upper_inclusive: false,
        label: "Low",
        points: 1.0,
        guidance: None,
    },
    BandRow {
        metric: Metric::MarketShareFactor,
        name: "medium",
        lower: 30.0,
        upper: Some(50.0),
        upper_inclusive: false,
        label: "Medium",
        points: 2.0,
        guidance: None,
    },
    BandRow {
        metric: Metric::MarketShareFactor,
        name: "high",
        lower: 50.0,
        upper: None,
        upper_inclusive: false,
        label: "High",
        points: 3.0,
        guidance: None,
    },
    BandRow {
        metric: Metric::HhiFactor,
        name: "low",
        lower: 0.0,
        upper: Some(1500.0),
        upper_inclusive: false,
        label: "Low",
        points: 1.0,
        guidance: None,
    },
    BandRow {
        metric: Metric::HhiFactor,
        name: "medium",
        lower: 1500.0,
        upper: Some(2500.0),
        upper_inclusive: false,
        label: "Medium",
        points: 2.0,
        guidance: None,
    },
    BandRow {
        metric: Metric::HhiFactor,
        name: "high",
        lower: 2500.0,
        upper: None,
        upper_inclusive: false,
        label: "High",
        points: 3.0,
        guidance: None,
    },
    BandRow {
        metric: Metric::RivalConcentrationFactor,
        name: "low",
        lower: 0.0,
        upper: Some(60.0),
        upper_inclusive: false,
        label: "Low",
        points: 0.0,
        guidance: None,
    },
    BandRow {
        metric: Metric::RivalConcentrationFactor,
        name: "medium",
        lower: 60.0,
        upper: Some(80.0),
        upper_inclusive: false,
        label: "Medium",
        points: 1.0,
        guidance: None,
    },
    BandRow {
        metric: Metric::RivalConcentrationFactor,
        name: "high",
        lower: 80.0,
        upper: None,
        upper_inclusive: false,
        label: "High",
        points: 2.0,
        guidance: None,
    },
];

fn bands() -> Vec<ThresholdBand> {
    BANDS
        .iter()
        .map(|row| ThresholdBand {
            name: row.name.to_string(),
            jurisdiction: GENERAL_JURISDICTION.to_string(),
            metric: row.metric,
            lower_bound: row.lower,
            upper_bound: row.upper,
            upper_inclusive: row.upper_inclusive,
            label: row.label.to_string(),
            points: row.points,
            guidance: row.guidance.map(str::to_string),
        })
        .collect()
}

const QUESTIONS: &[(&str, &str, &str, f64)] = &[
    (
        "pricing_practices",
        "Do you engage in price fixing or coordinate prices with competitors?",
        "Pricing",
        3.0,
    ),
    (
        "market_sharing",
        "Do you agree with competitors to divide markets or customers?",
        "Market Division",
        3.0,
    ),
    (
        "bid_rigging",
        "Do you coordinate bidding with competitors in tenders?",
        "Bid Rigging",
        3.0,
    ),
    (
        "information_exchange",
        "Do you exchange competitively sensitive information with competitors?",
        "Information Exchange",
        2.0,
    ),
    (
        "exclusive_dealing",
        "Do you require customers to purchase exclusively from you?",
        "Exclusive Dealing",
        2.0,
    ),
    (
        "tying_bundling",
        "Do you tie the sale of one product to another?",
        "Tying & Bundling",
        2.0,
    ),
    (
        "predatory_pricing",
        "Do you set prices below cost to eliminate competitors?",
        "Predatory Pricing",
        2.0,
    ),
    (
        "refusal_to_deal",
        "Do you refuse to deal with certain customers without objective justification?",
        "Refusal to Deal",
        1.0,
    ),
    (
        "discriminatory_pricing",
        "Do you charge different prices to similar customers without justification?",
        "Price Discrimination",
        1.0,
    ),
    (
        "resale_price_maintenance",
        "Do you control the resale prices of your products?",
        "Resale Price Maintenance",
        2.0,
    ),
];

fn checklist_questions() -> Vec<ChecklistQuestion> {
    QUESTIONS
        .iter()
        .map(|(id, question, category, weight)| ChecklistQuestion {
            id: id.to_string(),
            question: question.to_string(),
            category: category.to_string(),
            weight: *weight,
        })
        .collect()
}
