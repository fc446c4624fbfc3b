//! Declarative page catalog. Each page names the calculator it feeds and the
//! fields its form must carry; `PageCatalog::parse` turns a submitted JSON
//! form into a typed [`EvaluationRequest`].

mod form;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::currency::CurrencyCode;
use crate::evaluation::{CalculationMode, EvaluationRequest, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageId {
    MergerCalculator,
    HhiCalculator,
    ComplianceChecklist,
    DominanceChecker,
}

impl PageId {
    pub const ALL: [PageId; 4] = [
        PageId::MergerCalculator,
        PageId::HhiCalculator,
        PageId::ComplianceChecklist,
        PageId::DominanceChecker,
    ];

    pub const fn slug(self) -> &'static str {
        match self {
            PageId::MergerCalculator => "merger-calculator",
            PageId::HhiCalculator => "hhi-calculator",
            PageId::ComplianceChecklist => "compliance-checklist",
            PageId::DominanceChecker => "dominance-checker",
        }
    }

    pub const fn mode(self) -> CalculationMode {
        match self {
            PageId::MergerCalculator => CalculationMode::Merger,
            PageId::HhiCalculator => CalculationMode::Hhi,
            PageId::ComplianceChecklist => CalculationMode::Checklist,
            PageId::DominanceChecker => CalculationMode::Dominance,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        PageId::ALL
            .into_iter()
            .find(|page| page.slug() == key)
            .ok_or_else(|| ValidationError::UnknownPage(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Percentage,
    Flag,
    Choice,
    Currency,
    /// List of `{name, role, turnover, currency}` objects.
    PartyList,
    /// List of `{name, share}` objects.
    ShareList,
    /// Percentages without names.
    PercentageList,
    /// Object of question id to answer.
    AnswerMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    #[serde(skip_serializing_if = "no_choices")]
    pub choices: &'static [&'static str],
}

fn no_choices(choices: &&'static [&'static str]) -> bool {
    choices.is_empty()
}

impl FieldSpec {
    const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            default: None,
            choices: &[],
        }
    }

    const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            default: None,
            choices: &[],
        }
    }

    const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    const fn with_choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = choices;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSchema {
    pub page: PageId,
    pub title: &'static str,
    pub description: &'static str,
    pub mode: CalculationMode,
    pub fields: Vec<FieldSpec>,
}

const ROLES: &[&str] = &["acquirer", "target"];
const ANSWERS: &[&str] = &["no", "sometimes", "yes"];
const BARRIERS: &[&str] = &["low", "medium", "high"];

/// Markets with fewer firms are rejected by the HHI page.
pub const MIN_HHI_FIRMS: usize = 2;

pub fn schema(page: PageId) -> PageSchema {
    let (description, fields) = match page {
        PageId::MergerCalculator => (
            "Check whether a transaction meets the merger notification thresholds.",
            vec![
                FieldSpec::optional("jurisdiction", "Jurisdiction", FieldKind::Choice)
                    .with_default("turkish"),
                FieldSpec::optional("currency", "Input currency", FieldKind::Currency),
                FieldSpec::required("parties", "Parties and turnovers", FieldKind::PartyList)
                    .with_choices(ROLES),
            ],
        ),
        PageId::HhiCalculator => (
            "Compute the Herfindahl-Hirschman Index of a market.",
            vec![
                FieldSpec::required("firms", "Firm market shares", FieldKind::ShareList),
                FieldSpec::optional("normalize", "Normalize shares to 100%", FieldKind::Flag)
                    .with_default("false"),
                FieldSpec::optional("jurisdiction", "Jurisdiction", FieldKind::Choice)
                    .with_default("general"),
            ],
        ),
        PageId::ComplianceChecklist => (
            "Score business practices against common competition-law risks.",
            vec![
                FieldSpec::required("answers", "Checklist answers", FieldKind::AnswerMap)
                    .with_choices(ANSWERS),
                FieldSpec::optional("jurisdiction", "Jurisdiction", FieldKind::Choice)
                    .with_default("general"),
            ],
        ),
        PageId::DominanceChecker => (
            "Estimate the risk that a firm holds a dominant position.",
            vec![
                FieldSpec::required("market_share", "Market share", FieldKind::Percentage),
                FieldSpec::optional("market_hhi", "Market HHI", FieldKind::Number),
                FieldSpec::optional("rival_shares", "Rival market shares", FieldKind::PercentageList),
                FieldSpec::optional("vertical_integration", "Vertically integrated", FieldKind::Flag)
                    .with_default("false"),
                FieldSpec::optional("network_effects", "Network effects", FieldKind::Flag)
                    .with_default("false"),
                FieldSpec::optional("entry_barriers", "Barriers to entry", FieldKind::Choice)
                    .with_default("medium")
                    .with_choices(BARRIERS),
                FieldSpec::optional("jurisdiction", "Jurisdiction", FieldKind::Choice)
                    .with_default("general"),
            ],
        ),
    };

    PageSchema {
        page,
        title: page.mode().title(),
        description,
        mode: page.mode(),
        fields,
    }
}

/// Page schemas plus the currency assumed when a form does not name one.
#[derive(Debug, Clone)]
pub struct PageCatalog {
    default_currency: CurrencyCode,
}

impl PageCatalog {
    pub fn new(default_currency: CurrencyCode) -> Self {
        Self { default_currency }
    }

    pub fn pages(&self) -> Vec<PageSchema> {
        PageId::ALL.into_iter().map(schema).collect()
    }

    pub fn default_currency(&self) -> &CurrencyCode {
        &self.default_currency
    }

    /// Validate a submitted form and build the typed request, reporting the
    /// first offending field.
    pub fn parse(
        &self,
        page: PageId,
        form: &Map<String, Value>,
    ) -> Result<EvaluationRequest, ValidationError> {
        match page {
            PageId::MergerCalculator => form::merger(form, &self.default_currency),
            PageId::HhiCalculator => form::hhi(form),
            PageId::ComplianceChecklist => form::checklist(form),
            PageId::DominanceChecker => form::dominance(form),
        }
    }
}
