//! CSV and plain-text renderings of results and history. Values are rounded
//! here, never in the engine.

use std::fmt::Write as _;

use crate::evaluation::{CalculationMode, Classification, EvaluationResult};
use crate::history::HistoryRecord;
use crate::DISCLAIMER;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer could not be flushed: {0}")]
    Flush(String),
    #[error("csv output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Download formats for a single result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Text,
}

impl ReportFormat {
    pub const fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv; charset=utf-8",
            ReportFormat::Text => "text/plain; charset=utf-8",
        }
    }

    pub fn render(self, result: &EvaluationResult) -> Result<String, ExportError> {
        match self {
            ReportFormat::Csv => result_csv(result),
            ReportFormat::Text => Ok(text_report(result)),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "text" | "txt" | "report" => Ok(ReportFormat::Text),
            other => Err(format!("unknown report format '{other}'")),
        }
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn score_text(result: &EvaluationResult) -> String {
    match (result.mode, result.numeric_score) {
        (CalculationMode::Hhi, Some(score)) => format!("{score:.0}"),
        (_, Some(score)) => format!("{score:.2}"),
        (_, None) => String::new(),
    }
}

/// One row per input and score component, followed by the verdict.
pub fn result_csv(result: &EvaluationResult) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["section", "name", "level", "value", "notes"])?;

    for input in &result.inputs {
        let value = input.value.to_string();
        writer.write_record(["input", input.name.as_str(), "", value.as_str(), ""])?;
    }
    for component in &result.components {
        let score = format!("{:.2}", component.score);
        writer.write_record([
            "component",
            component.factor.as_str(),
            component.level.as_deref().unwrap_or(""),
            score.as_str(),
            component.notes.as_str(),
        ])?;
    }

    let notes = match &result.classification {
        Classification::Band { guidance, .. } => guidance.clone().unwrap_or_default(),
        Classification::Undetermined { reason } => reason.clone(),
    };
    let score = score_text(result);
    writer.write_record([
        "result",
        result.mode.slug(),
        result.label(),
        score.as_str(),
        notes.as_str(),
    ])?;
    writer.write_record(["note", "disclaimer", "", "", DISCLAIMER])?;

    finish(writer)
}

pub fn history_csv(records: &[HistoryRecord]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "recorded_at",
        "mode",
        "jurisdiction",
        "classification",
        "score",
        "registry_version",
    ])?;

    for record in records {
        let recorded_at = record.recorded_at.to_rfc3339();
        let score = score_text(&record.result);
        writer.write_record([
            record.id.as_str(),
            recorded_at.as_str(),
            record.mode.slug(),
            record.result.jurisdiction.as_str(),
            record.result.label(),
            score.as_str(),
            record.result.registry_version.as_str(),
        ])?;
    }

    finish(writer)
}

fn heading(out: &mut String, title: &str, underline: char) {
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", underline.to_string().repeat(title.chars().count()));
}

/// Printable report used in place of the PDF download.
pub fn text_report(result: &EvaluationResult) -> String {
    let mut out = String::new();
    heading(&mut out, result.mode.title(), '=');
    let _ = writeln!(
        out,
        "Generated: {}",
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Jurisdiction: {}", result.jurisdiction);
    let _ = writeln!(out, "Registry version: {}", result.registry_version);

    out.push('\n');
    heading(&mut out, "Inputs", '-');
    for input in &result.inputs {
        let _ = writeln!(out, "- {}: {}", input.name, input.value);
    }

    if !result.components.is_empty() {
        out.push('\n');
        heading(&mut out, "Score breakdown", '-');
        for component in &result.components {
            let level = component
                .level
                .as_deref()
                .map(|level| format!(" [{level}]"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "- {}{level}: {:.2} ({})",
                component.factor, component.score, component.notes
            );
        }
    }

    out.push('\n');
    heading(&mut out, "Result", '-');
    let _ = writeln!(out, "{}", result.label());
    let score = score_text(result);
    if !score.is_empty() {
        match (result.mode, result.score_ceiling) {
            (CalculationMode::Hhi, _) => {
                let _ = writeln!(out, "HHI: {score}");
            }
            (_, Some(ceiling)) => {
                let _ = writeln!(out, "Score: {score} of {ceiling:.2}");
            }
            (_, None) => {
                let _ = writeln!(out, "Score: {score}");
            }
        }
    }
    match &result.classification {
        Classification::Band {
            guidance: Some(guidance),
            ..
        } => {
            let _ = writeln!(out, "Guidance: {guidance}");
        }
        Classification::Undetermined { reason } => {
            let _ = writeln!(out, "Reason: {reason}");
        }
        _ => {}
    }

    out.push('\n');
    let _ = writeln!(out, "Disclaimer: {DISCLAIMER}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{
        EvaluationEngine, EvaluationRequest, FirmShare, HhiRequest, MetricInput, MetricValue,
        ScoreComponent,
    };
    use crate::history::HistoryRecord;
    use chrono::{TimeZone, Utc};

    fn hhi_result() -> EvaluationResult {
        let request = EvaluationRequest::Hhi(HhiRequest {
            jurisdiction: "general".to_string(),
            firms: [("Alpha", 40.0), ("Beta", 30.0), ("Gamma, Ltd", 20.0), ("Delta", 10.0)]
                .into_iter()
                .map(|(name, share)| FirmShare {
                    name: name.to_string(),
                    share,
                })
                .collect(),
            normalize: false,
        });
        let at = Utc
            .with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
            .single()
            .expect("timestamp");
        EvaluationEngine::default()
            .evaluate_at(&request, at)
            .expect("evaluates")
    }

    #[test]
    fn result_csv_lists_components_and_verdict() {
        let output = result_csv(&hhi_result()).expect("csv");
        let mut reader = csv::Reader::from_reader(output.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|row| row.expect("row")).collect();

        assert!(rows
            .iter()
            .any(|row| &row[0] == "component" && &row[1] == "Gamma, Ltd" && &row[3] == "400.00"));
        let verdict = rows
            .iter()
            .find(|row| &row[0] == "result")
            .expect("result row");
        assert_eq!(&verdict[2], "Highly concentrated");
        assert_eq!(&verdict[3], "3000");
        assert_eq!(&rows[rows.len() - 1][4], DISCLAIMER);
    }

    #[test]
    fn history_csv_has_one_row_per_record() {
        let result = hhi_result();
        let records = vec![
            HistoryRecord::new(result.clone(), result.timestamp),
            HistoryRecord::new(result.clone(), result.timestamp),
        ];

        let output = history_csv(&records).expect("csv");
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,recorded_at,mode"));
        assert!(lines[1].contains("Highly concentrated"));
    }

    #[test]
    fn text_report_carries_verdict_and_disclaimer() {
        let report = text_report(&hhi_result());

        assert!(report.starts_with("HHI Market Concentration Calculator\n"));
        assert!(report.contains("Generated: 2025-03-14 09:30:00 UTC"));
        assert!(report.contains("HHI: 3000"));
        assert!(report.contains("Guidance: High concentration"));
        assert!(report.ends_with(&format!("Disclaimer: {DISCLAIMER}\n")));
    }

    #[test]
    fn report_format_parses_aliases() {
        assert_eq!("CSV".parse::<ReportFormat>(), Ok(ReportFormat::Csv));
        assert_eq!("txt".parse::<ReportFormat>(), Ok(ReportFormat::Text));
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn text_report_explains_undetermined_results() {
        let mut result = hhi_result();
        result.classification = Classification::Undetermined {
            reason: "hhi value 25 falls outside every registered band".to_string(),
        };
        result.inputs = vec![MetricInput::new("shares", MetricValue::Numbers(vec![5.0]))];
        result.components = vec![ScoreComponent {
            factor: "Solo".to_string(),
            level: None,
            score: 25.0,
            notes: "market share 5.00%".to_string(),
        }];

        let report = text_report(&result);
        assert!(report.contains("Undetermined"));
        assert!(report.contains("Reason: hhi value 25"));
        assert!(report.contains("- shares: [5.00]"));
    }
}
