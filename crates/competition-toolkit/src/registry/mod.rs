//! Versioned threshold and band tables consulted by the evaluation engine.
//!
//! The registry is loaded once at start-up (either the built-in standard table
//! or a JSON document) and is never mutated afterwards. Changing a threshold
//! means shipping a new document, so every value used in a decision can be
//! traced back to a versioned source.

mod bands;
mod standard;

pub use bands::{BandTable, ThresholdBand};
pub use standard::STANDARD_REGISTRY_VERSION;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::currency::CurrencyCode;

/// Jurisdiction key for tables that apply everywhere unless overridden.
pub const GENERAL_JURISDICTION: &str = "general";

/// Metric a band table classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Number of merger threshold tests met.
    MergerOutcome,
    /// Herfindahl-Hirschman Index.
    Hhi,
    /// Weighted compliance checklist score.
    ChecklistRisk,
    /// Bounded dominance risk score.
    DominanceRisk,
    /// Points awarded for the firm's own market share.
    MarketShareFactor,
    /// Points awarded for the market HHI.
    HhiFactor,
    /// Points awarded for the combined share of the three largest rivals.
    RivalConcentrationFactor,
}

impl Metric {
    pub const fn label(self) -> &'static str {
        match self {
            Metric::MergerOutcome => "merger_outcome",
            Metric::Hhi => "hhi",
            Metric::ChecklistRisk => "checklist_risk",
            Metric::DominanceRisk => "dominance_risk",
            Metric::MarketShareFactor => "market_share_factor",
            Metric::HhiFactor => "hhi_factor",
            Metric::RivalConcentrationFactor => "rival_concentration_factor",
        }
    }

    pub const fn ordered() -> [Metric; 7] {
        [
            Metric::MergerOutcome,
            Metric::Hhi,
            Metric::ChecklistRisk,
            Metric::DominanceRisk,
            Metric::MarketShareFactor,
            Metric::HhiFactor,
            Metric::RivalConcentrationFactor,
        ]
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Turnover thresholds that trigger a merger notification in one jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergerThresholds {
    pub jurisdiction: String,
    pub currency: CurrencyCode,
    /// Compared against the combined turnover of all parties.
    pub global_threshold: f64,
    /// Compared against the larger of the acquirer-side and target-side totals.
    pub local_threshold: f64,
    pub description: String,
}

/// Points for the yes/no and categorical dominance factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominanceWeights {
    pub vertical_integration: f64,
    pub network_effects: f64,
    pub entry_barriers: BarrierPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierPoints {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl BarrierPoints {
    pub fn max(&self) -> f64 {
        self.low.max(self.medium).max(self.high)
    }
}

/// One weighted self-assessment question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistQuestion {
    pub id: String,
    pub question: String,
    pub category: String,
    pub weight: f64,
}

/// Serialized form of the registry, used for loading and for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub version: String,
    pub merger_thresholds: Vec<MergerThresholds>,
    pub bands: Vec<ThresholdBand>,
    pub dominance_weights: DominanceWeights,
    pub checklist_questions: Vec<ChecklistQuestion>,
}

/// Read-only lookup of thresholds and bands keyed by jurisdiction and metric.
#[derive(Debug, Clone)]
pub struct ThresholdRegistry {
    version: String,
    merger: BTreeMap<String, MergerThresholds>,
    tables: BTreeMap<(String, Metric), BandTable>,
    dominance_weights: DominanceWeights,
    checklist_questions: Vec<ChecklistQuestion>,
}

impl ThresholdRegistry {
    /// Built-in tables shipped with the crate.
    pub fn standard() -> Self {
        Self::from_document(standard::document()).expect("standard registry document is valid")
    }

    /// Load from `path` when given, otherwise fall back to the standard tables.
    pub fn load(path: Option<&Path>) -> Result<Self, RegistryError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::standard()),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: RegistryDocument = serde_json::from_str(&raw)?;
        let registry = Self::from_document(document)?;
        info!(
            version = %registry.version,
            path = %path.display(),
            "threshold registry loaded"
        );
        Ok(registry)
    }

    pub fn from_document(document: RegistryDocument) -> Result<Self, RegistryError> {
        let RegistryDocument {
            version,
            merger_thresholds,
            bands,
            dominance_weights,
            checklist_questions,
        } = document;

        let mut merger = BTreeMap::new();
        for thresholds in merger_thresholds {
            let key = normalize_jurisdiction(&thresholds.jurisdiction);
            let valid = |value: f64| value.is_finite() && value > 0.0;
            if !valid(thresholds.global_threshold) || !valid(thresholds.local_threshold) {
                return Err(RegistryError::InvalidThreshold { jurisdiction: key });
            }
            if merger.insert(key.clone(), thresholds).is_some() {
                return Err(RegistryError::DuplicateJurisdiction(key));
            }
        }

        let mut grouped: BTreeMap<(String, Metric), Vec<ThresholdBand>> = BTreeMap::new();
        for band in bands {
            let key = (normalize_jurisdiction(&band.jurisdiction), band.metric);
            grouped.entry(key).or_default().push(band);
        }

        let mut tables = BTreeMap::new();
        for ((jurisdiction, metric), bands) in grouped {
            let table = BandTable::new(&jurisdiction, metric, bands)?;
            tables.insert((jurisdiction, metric), table);
        }

        for metric in Metric::ordered() {
            if !tables.contains_key(&(GENERAL_JURISDICTION.to_string(), metric)) {
                return Err(RegistryError::MissingTable { metric });
            }
        }

        let barriers = &dominance_weights.entry_barriers;
        let weight_ok = |value: f64| value.is_finite() && value >= 0.0;
        if ![
            dominance_weights.vertical_integration,
            dominance_weights.network_effects,
            barriers.low,
            barriers.medium,
            barriers.high,
        ]
        .into_iter()
        .all(weight_ok)
        {
            return Err(RegistryError::InvalidWeight("dominance_weights".to_string()));
        }

        let mut seen = Vec::with_capacity(checklist_questions.len());
        for question in &checklist_questions {
            if seen.contains(&question.id.as_str()) {
                return Err(RegistryError::DuplicateQuestion(question.id.clone()));
            }
            if !question.weight.is_finite() || question.weight < 0.0 {
                return Err(RegistryError::InvalidWeight(question.id.clone()));
            }
            seen.push(question.id.as_str());
        }

        Ok(Self {
            version,
            merger,
            tables,
            dominance_weights,
            checklist_questions,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn merger_thresholds(&self, jurisdiction: &str) -> Option<&MergerThresholds> {
        self.merger.get(&normalize_jurisdiction(jurisdiction))
    }

    /// Every jurisdiction's merger thresholds, ordered by jurisdiction.
    pub fn all_merger_thresholds(&self) -> impl Iterator<Item = &MergerThresholds> {
        self.merger.values()
    }

    pub fn jurisdictions(&self) -> impl Iterator<Item = &str> {
        self.merger.keys().map(String::as_str)
    }

    /// True for the general key and for any jurisdiction with thresholds or bands.
    pub fn knows_jurisdiction(&self, jurisdiction: &str) -> bool {
        let key = normalize_jurisdiction(jurisdiction);
        key == GENERAL_JURISDICTION
            || self.merger.contains_key(&key)
            || self.tables.keys().any(|(table_key, _)| *table_key == key)
    }

    /// Table for `metric` in `jurisdiction`, falling back to the general table.
    pub fn band_table(&self, jurisdiction: &str, metric: Metric) -> Option<&BandTable> {
        self.tables
            .get(&(normalize_jurisdiction(jurisdiction), metric))
            .or_else(|| {
                self.tables
                    .get(&(GENERAL_JURISDICTION.to_string(), metric))
            })
    }

    pub fn dominance_weights(&self) -> &DominanceWeights {
        &self.dominance_weights
    }

    pub fn checklist_questions(&self) -> &[ChecklistQuestion] {
        &self.checklist_questions
    }

    pub fn checklist_question(&self, id: &str) -> Option<&ChecklistQuestion> {
        self.checklist_questions
            .iter()
            .find(|question| question.id == id)
    }

    pub fn document(&self) -> RegistryDocument {
        RegistryDocument {
            version: self.version.clone(),
            merger_thresholds: self.merger.values().cloned().collect(),
            bands: self
                .tables
                .values()
                .flat_map(|table| table.bands().iter().cloned())
                .collect(),
            dominance_weights: self.dominance_weights.clone(),
            checklist_questions: self.checklist_questions.clone(),
        }
    }
}

impl Default for ThresholdRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn normalize_jurisdiction(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Problems found while loading or validating a registry document.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unable to read registry document {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("registry document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("band `{band}` in {jurisdiction}/{metric} has an empty or invalid range")]
    InvalidBand {
        jurisdiction: String,
        metric: Metric,
        band: String,
    },
    #[error("bands `{first}` and `{second}` in {jurisdiction}/{metric} overlap")]
    OverlappingBands {
        jurisdiction: String,
        metric: Metric,
        first: String,
        second: String,
    },
    #[error("bands `{first}` and `{second}` in {jurisdiction}/{metric} leave a gap")]
    GapBetweenBands {
        jurisdiction: String,
        metric: Metric,
        first: String,
        second: String,
    },
    #[error("only the last band in {jurisdiction}/{metric} may be unbounded (found `{band}`)")]
    UnboundedBand {
        jurisdiction: String,
        metric: Metric,
        band: String,
    },
    #[error("merger thresholds for `{jurisdiction}` must be positive")]
    InvalidThreshold { jurisdiction: String },
    #[error("jurisdiction `{0}` is defined more than once")]
    DuplicateJurisdiction(String),
    #[error("registry is missing the general `{metric}` table")]
    MissingTable { metric: Metric },
    #[error("checklist question `{0}` is defined more than once")]
    DuplicateQuestion(String),
    #[error("weight `{0}` is negative or not finite")]
    InvalidWeight(String),
}
