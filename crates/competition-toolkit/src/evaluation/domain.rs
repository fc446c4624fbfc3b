use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::{format_amount, Conversion, Money};
use crate::registry::GENERAL_JURISDICTION;

use super::validation::ValidationError;

/// Calculator a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    Merger,
    Hhi,
    Checklist,
    Dominance,
}

impl CalculationMode {
    pub const ALL: [CalculationMode; 4] = [
        CalculationMode::Merger,
        CalculationMode::Hhi,
        CalculationMode::Checklist,
        CalculationMode::Dominance,
    ];

    pub const fn slug(self) -> &'static str {
        match self {
            CalculationMode::Merger => "merger",
            CalculationMode::Hhi => "hhi",
            CalculationMode::Checklist => "checklist",
            CalculationMode::Dominance => "dominance",
        }
    }

    /// Stable key used to name the history file of this calculator.
    pub const fn history_key(self) -> &'static str {
        match self {
            CalculationMode::Merger => "merger_calculator",
            CalculationMode::Hhi => "hhi_calculator",
            CalculationMode::Checklist => "compliance_checklist",
            CalculationMode::Dominance => "dominance_checker",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            CalculationMode::Merger => "Merger Notification Threshold Calculator",
            CalculationMode::Hhi => "HHI Market Concentration Calculator",
            CalculationMode::Checklist => "Competition Compliance Checklist",
            CalculationMode::Dominance => "Market Dominance Risk Checker",
        }
    }
}

impl fmt::Display for CalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CalculationMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        CalculationMode::ALL
            .into_iter()
            .find(|mode| mode.slug() == key || mode.history_key() == key)
            .ok_or_else(|| ValidationError::InvalidChoice {
                field: "mode".to_string(),
                value: s.to_string(),
                allowed: "merger, hhi, checklist, dominance".to_string(),
            })
    }
}

/// Named input value captured on a result so it can be audited later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricInput {
    pub name: String,
    pub value: MetricValue,
}

impl MetricInput {
    pub fn new(name: impl Into<String>, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
    Category(String),
    Numbers(Vec<f64>),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(value) => f.write_str(&format_amount(*value)),
            MetricValue::Flag(value) => f.write_str(if *value { "yes" } else { "no" }),
            MetricValue::Category(value) | MetricValue::Text(value) => f.write_str(value),
            MetricValue::Numbers(values) => {
                let rendered: Vec<String> = values.iter().map(|value| format!("{value:.2}")).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// Outcome of classifying a score: exactly one band, or an explicit
/// undetermined result when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    Band {
        band: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        guidance: Option<String>,
    },
    Undetermined {
        reason: String,
    },
}

impl Classification {
    pub fn label(&self) -> &str {
        match self {
            Classification::Band { label, .. } => label,
            Classification::Undetermined { .. } => "Undetermined",
        }
    }

    pub fn band(&self) -> Option<&str> {
        match self {
            Classification::Band { band, .. } => Some(band),
            Classification::Undetermined { .. } => None,
        }
    }
}

/// Discrete contribution to a score, kept for audits and exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub score: f64,
    pub notes: String,
}

/// Immutable record of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub mode: CalculationMode,
    pub jurisdiction: String,
    pub registry_version: String,
    pub inputs: Vec<MetricInput>,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_score: Option<f64>,
    /// Largest score the calculator can produce, when bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_ceiling: Option<f64>,
    pub components: Vec<ScoreComponent>,
    pub timestamp: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn label(&self) -> &str {
        self.classification.label()
    }

    pub fn is_undetermined(&self) -> bool {
        matches!(self.classification, Classification::Undetermined { .. })
    }

    pub fn summary(&self) -> String {
        let score = match (self.numeric_score, self.score_ceiling) {
            (Some(score), Some(ceiling)) => format!(" (score {score:.2} of {ceiling:.2})"),
            (Some(score), None) => format!(" (score {score:.2})"),
            _ => String::new(),
        };
        match &self.classification {
            Classification::Band { label, .. } => format!("{}: {label}{score}", self.mode),
            Classification::Undetermined { reason } => {
                format!("{}: undetermined{score}: {reason}", self.mode)
            }
        }
    }

    pub fn input(&self, name: &str) -> Option<&MetricValue> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| &input.value)
    }
}

pub(crate) fn general_jurisdiction() -> String {
    GENERAL_JURISDICTION.to_string()
}

/// Typed evaluation request, tagged by calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EvaluationRequest {
    Merger(MergerRequest),
    Hhi(HhiRequest),
    Checklist(ChecklistRequest),
    Dominance(DominanceRequest),
}

impl EvaluationRequest {
    pub fn mode(&self) -> CalculationMode {
        match self {
            EvaluationRequest::Merger(_) => CalculationMode::Merger,
            EvaluationRequest::Hhi(_) => CalculationMode::Hhi,
            EvaluationRequest::Checklist(_) => CalculationMode::Checklist,
            EvaluationRequest::Dominance(_) => CalculationMode::Dominance,
        }
    }

    pub fn jurisdiction(&self) -> &str {
        match self {
            EvaluationRequest::Merger(request) => &request.jurisdiction,
            EvaluationRequest::Hhi(request) => &request.jurisdiction,
            EvaluationRequest::Checklist(request) => &request.jurisdiction,
            EvaluationRequest::Dominance(request) => &request.jurisdiction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Acquirer,
    Target,
}

impl PartyRole {
    pub const fn label(self) -> &'static str {
        match self {
            PartyRole::Acquirer => "acquirer",
            PartyRole::Target => "target",
        }
    }
}

impl FromStr for PartyRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acquirer" | "buyer" => Ok(PartyRole::Acquirer),
            "target" => Ok(PartyRole::Target),
            _ => Err(()),
        }
    }
}

/// Undertaking involved in a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergerParty {
    pub name: String,
    pub role: PartyRole,
    /// Turnover in the currency it was reported in; missing is a validation error.
    #[serde(default)]
    pub turnover: Option<Money>,
    /// Set when the turnover was converted into the threshold currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<Conversion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergerRequest {
    pub jurisdiction: String,
    pub parties: Vec<MergerParty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmShare {
    pub name: String,
    /// Percentage on the 0-100 scale.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HhiRequest {
    #[serde(default = "general_jurisdiction")]
    pub jurisdiction: String,
    pub firms: Vec<FirmShare>,
    /// Rescale shares to sum to 100 before squaring.
    #[serde(default)]
    pub normalize: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistAnswer {
    No,
    Sometimes,
    Yes,
}

impl ChecklistAnswer {
    /// Share of the question weight the answer contributes.
    pub const fn fraction(self) -> f64 {
        match self {
            ChecklistAnswer::No => 0.0,
            ChecklistAnswer::Sometimes => 0.5,
            ChecklistAnswer::Yes => 1.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ChecklistAnswer::No => "no",
            ChecklistAnswer::Sometimes => "sometimes",
            ChecklistAnswer::Yes => "yes",
        }
    }
}

impl FromStr for ChecklistAnswer {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "no" => Ok(ChecklistAnswer::No),
            "sometimes" => Ok(ChecklistAnswer::Sometimes),
            "yes" => Ok(ChecklistAnswer::Yes),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistRequest {
    #[serde(default = "general_jurisdiction")]
    pub jurisdiction: String,
    /// Answers keyed by question id.
    pub answers: BTreeMap<String, ChecklistAnswer>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl BarrierLevel {
    pub const fn label(self) -> &'static str {
        match self {
            BarrierLevel::Low => "low",
            BarrierLevel::Medium => "medium",
            BarrierLevel::High => "high",
        }
    }
}

impl FromStr for BarrierLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(BarrierLevel::Low),
            "medium" => Ok(BarrierLevel::Medium),
            "high" => Ok(BarrierLevel::High),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominanceRequest {
    #[serde(default = "general_jurisdiction")]
    pub jurisdiction: String,
    /// The firm's own share, 0-100.
    #[serde(default)]
    pub market_share: Option<f64>,
    #[serde(default)]
    pub market_hhi: Option<f64>,
    #[serde(default)]
    pub rival_shares: Vec<f64>,
    #[serde(default)]
    pub vertical_integration: bool,
    #[serde(default)]
    pub network_effects: bool,
    #[serde(default)]
    pub entry_barriers: BarrierLevel,
}
