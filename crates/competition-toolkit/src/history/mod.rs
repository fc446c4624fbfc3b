//! Append-only record of past evaluations, kept per calculator.

mod jsonl;

pub use jsonl::JsonlHistoryStore;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluation::{CalculationMode, EvaluationResult};

/// Records shown by the "recent" views unless asked otherwise.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub mode: CalculationMode,
    pub recorded_at: DateTime<Utc>,
    pub result: EvaluationResult,
}

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

impl HistoryRecord {
    pub fn new(result: EvaluationResult, recorded_at: DateTime<Utc>) -> Self {
        let sequence = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!(
                "{}-{}-{sequence:04}",
                result.mode.slug(),
                recorded_at.timestamp_millis()
            ),
            mode: result.mode,
            recorded_at,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub mode: CalculationMode,
    pub total: usize,
    pub last_recorded_at: Option<DateTime<Utc>>,
    /// Classification label seen most often; ties go to the label seen first.
    pub most_common: Option<String>,
}

impl HistorySummary {
    pub fn from_records(mode: CalculationMode, records: &[HistoryRecord]) -> Self {
        let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for (position, record) in records.iter().enumerate() {
            let entry = counts.entry(record.result.label()).or_insert((0, position));
            entry.0 += 1;
        }

        let most_common = counts
            .into_iter()
            .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
                count_a.cmp(count_b).then(first_b.cmp(first_a))
            })
            .map(|(label, _)| label.to_string());

        Self {
            mode,
            total: records.len(),
            last_recorded_at: records.iter().map(|record| record.recorded_at).max(),
            most_common,
        }
    }
}

/// Storage abstraction so the service can be exercised without touching disk.
pub trait HistoryStore: Send + Sync {
    fn append(&self, result: &EvaluationResult) -> Result<HistoryRecord, HistoryError>;
    /// All records for `mode`, oldest first.
    fn load(&self, mode: CalculationMode) -> Result<Vec<HistoryRecord>, HistoryError>;
    /// Remove every record for `mode`, returning how many were dropped.
    fn clear(&self, mode: CalculationMode) -> Result<usize, HistoryError>;

    /// Newest first.
    fn recent(&self, mode: CalculationMode, limit: usize) -> Result<Vec<HistoryRecord>, HistoryError> {
        let mut records = self.load(mode)?;
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    fn summary(&self, mode: CalculationMode) -> Result<HistorySummary, HistoryError> {
        let records = self.load(mode)?;
        Ok(HistorySummary::from_records(mode, &records))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history file {} is not accessible", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("history record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("history task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Process-local store used when history should not outlive the process.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, result: &EvaluationResult) -> Result<HistoryRecord, HistoryError> {
        let record = HistoryRecord::new(result.clone(), Utc::now());
        self.records
            .lock()
            .expect("history mutex poisoned")
            .push(record.clone());
        Ok(record)
    }

    fn load(&self, mode: CalculationMode) -> Result<Vec<HistoryRecord>, HistoryError> {
        let guard = self.records.lock().expect("history mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| record.mode == mode)
            .cloned()
            .collect())
    }

    fn clear(&self, mode: CalculationMode) -> Result<usize, HistoryError> {
        let mut guard = self.records.lock().expect("history mutex poisoned");
        let before = guard.len();
        guard.retain(|record| record.mode != mode);
        Ok(before - guard.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{Classification, EvaluationResult};

    pub(crate) fn result(mode: CalculationMode, label: &str, score: f64) -> EvaluationResult {
        EvaluationResult {
            mode,
            jurisdiction: "general".to_string(),
            registry_version: "test".to_string(),
            inputs: Vec::new(),
            classification: Classification::Band {
                band: label.to_ascii_lowercase(),
                label: label.to_string(),
                guidance: None,
            },
            numeric_score: Some(score),
            score_ceiling: None,
            components: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn recent_returns_newest_first() {
        let store = MemoryHistoryStore::default();
        for score in [1.0, 2.0, 3.0] {
            store
                .append(&result(CalculationMode::Hhi, "Low", score))
                .expect("append");
        }

        let recent = store.recent(CalculationMode::Hhi, 2).expect("recent");
        let scores: Vec<_> = recent
            .iter()
            .map(|record| record.result.numeric_score)
            .collect();
        assert_eq!(scores, [Some(3.0), Some(2.0)]);
    }

    #[test]
    fn summary_counts_most_common_label() {
        let store = MemoryHistoryStore::default();
        for label in ["High", "Low", "High"] {
            store
                .append(&result(CalculationMode::Dominance, label, 1.0))
                .expect("append");
        }
        store
            .append(&result(CalculationMode::Hhi, "Low", 1.0))
            .expect("append");

        let summary = store.summary(CalculationMode::Dominance).expect("summary");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.most_common.as_deref(), Some("High"));
        assert!(summary.last_recorded_at.is_some());
    }

    #[test]
    fn summary_of_empty_history() {
        let summary = HistorySummary::from_records(CalculationMode::Merger, &[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.most_common, None);
        assert_eq!(summary.last_recorded_at, None);
    }

    #[test]
    fn clear_only_touches_one_calculator() {
        let store = MemoryHistoryStore::default();
        store
            .append(&result(CalculationMode::Hhi, "Low", 1.0))
            .expect("append");
        store
            .append(&result(CalculationMode::Checklist, "Low", 1.0))
            .expect("append");

        assert_eq!(store.clear(CalculationMode::Hhi).expect("clear"), 1);
        assert!(store.load(CalculationMode::Hhi).expect("load").is_empty());
        assert_eq!(store.load(CalculationMode::Checklist).expect("load").len(), 1);
    }

    #[test]
    fn record_ids_are_unique() {
        let now = Utc::now();
        let first = HistoryRecord::new(result(CalculationMode::Hhi, "Low", 1.0), now);
        let second = HistoryRecord::new(result(CalculationMode::Hhi, "Low", 1.0), now);
        assert_ne!(first.id, second.id);
        assert!(first.id.starts_with("hhi-"));
    }
}
