use crate::infra::{
    build_toolkit, parse_answer, parse_firm, parse_manual_rate, parse_party, PartyArg, Toolkit,
};
use clap::{Args, Subcommand, ValueEnum};
use competition_toolkit::config::AppConfig;
use competition_toolkit::currency::{format_currency, CurrencyCode, ManualRate, Money};
use competition_toolkit::error::AppError;
use competition_toolkit::evaluation::{
    BarrierLevel, CalculationMode, ChecklistAnswer, ChecklistRequest, DominanceRequest,
    EvaluationRequest, EvaluationResult, FirmShare, HhiRequest, MergerParty, MergerRequest,
    PartyRole, ValidationError,
};
use competition_toolkit::export::ReportFormat;
use competition_toolkit::history::DEFAULT_RECENT_LIMIT;
use competition_toolkit::pages::MIN_HHI_FIRMS;
use competition_toolkit::service::{EvaluationOptions, ToolkitServiceError};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
}

#[derive(Args, Debug, Default)]
pub(crate) struct OutputArgs {
    /// How to print the result
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
    /// Write the result to a file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Do not append the result to the calculation history
    #[arg(long)]
    pub(crate) no_record: bool,
}

#[derive(Args, Debug)]
pub(crate) struct MergerArgs {
    /// Jurisdiction whose thresholds apply
    #[arg(long, default_value = "turkish")]
    pub(crate) jurisdiction: String,
    /// Acquirer-side undertaking as NAME=AMOUNT[:CUR]; repeat for several
    #[arg(long, value_parser = parse_party)]
    pub(crate) acquirer: Vec<PartyArg>,
    /// Target-side undertaking as NAME=AMOUNT[:CUR]; repeat for several
    #[arg(long, value_parser = parse_party)]
    pub(crate) target: Vec<PartyArg>,
    /// Currency for parties that do not name one (defaults to APP_BASE_CURRENCY)
    #[arg(long)]
    pub(crate) currency: Option<CurrencyCode>,
    /// Manual exchange rate as FROM:TO=RATE; used before any live rate
    #[arg(long, value_parser = parse_manual_rate)]
    pub(crate) rate: Vec<ManualRate>,
    #[command(flatten)]
    pub(crate) output: OutputArgs,
}

#[derive(Args, Debug)]
pub(crate) struct HhiArgs {
    /// Market share as NAME=SHARE or SHARE, in percent; repeat per firm
    #[arg(long = "firm", value_parser = parse_firm, required = true)]
    pub(crate) firms: Vec<FirmShare>,
    /// Rescale the shares so they total 100%
    #[arg(long)]
    pub(crate) normalize: bool,
    #[arg(long, default_value = "general")]
    pub(crate) jurisdiction: String,
    #[command(flatten)]
    pub(crate) output: OutputArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ChecklistArgs {
    /// Answer as QUESTION=no|sometimes|yes; repeat per question
    #[arg(long = "answer", value_parser = parse_answer)]
    pub(crate) answers: Vec<(String, ChecklistAnswer)>,
    /// Answer used for questions not given with --answer
    #[arg(long, default_value = "no", value_parser = parse_choice::<ChecklistAnswer>)]
    pub(crate) default_answer: ChecklistAnswer,
    #[arg(long, default_value = "general")]
    pub(crate) jurisdiction: String,
    #[command(flatten)]
    pub(crate) output: OutputArgs,
}

#[derive(Args, Debug)]
pub(crate) struct DominanceArgs {
    /// The firm's market share in percent
    #[arg(long)]
    pub(crate) share: f64,
    /// HHI of the relevant market, if known
    #[arg(long)]
    pub(crate) market_hhi: Option<f64>,
    /// A competitor's market share in percent; repeat per rival
    #[arg(long = "rival")]
    pub(crate) rivals: Vec<f64>,
    #[arg(long)]
    pub(crate) vertical_integration: bool,
    #[arg(long)]
    pub(crate) network_effects: bool,
    /// Barriers to entry: low, medium or high
    #[arg(long, default_value = "medium", value_parser = parse_choice::<BarrierLevel>)]
    pub(crate) entry_barriers: BarrierLevel,
    #[arg(long, default_value = "general")]
    pub(crate) jurisdiction: String,
    #[command(flatten)]
    pub(crate) output: OutputArgs,
}

#[derive(Subcommand, Debug)]
pub(crate) enum HistoryCommand {
    /// Show the most recent results, newest first
    List {
        mode: CalculationMode,
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// Count results and report the most common outcome
    Summary { mode: CalculationMode },
    /// Write every saved result as CSV
    Export {
        mode: CalculationMode,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete the saved results for one calculator
    Clear { mode: CalculationMode },
}

fn parse_choice<T: std::str::FromStr>(raw: &str) -> Result<T, String> {
    raw.parse::<T>()
        .map_err(|_| format!("'{raw}' is not one of the accepted values"))
}

fn bootstrap() -> Result<(AppConfig, Arc<Toolkit>), AppError> {
    let config = AppConfig::load()?;
    let toolkit = build_toolkit(&config)?;
    Ok((config, toolkit))
}

pub(crate) async fn run_merger(args: MergerArgs) -> Result<(), AppError> {
    let (config, toolkit) = bootstrap()?;
    let MergerArgs {
        jurisdiction,
        acquirer,
        target,
        currency,
        rate,
        output,
    } = args;

    let default_currency = currency.unwrap_or(config.currency.base_currency);
    let parties = acquirer
        .into_iter()
        .map(|party| (PartyRole::Acquirer, party))
        .chain(target.into_iter().map(|party| (PartyRole::Target, party)))
        .map(|(role, party)| MergerParty {
            name: party.name,
            role,
            turnover: Some(Money::new(
                party.amount,
                party.currency.unwrap_or_else(|| default_currency.clone()),
            )),
            conversion: None,
        })
        .collect();

    let request = EvaluationRequest::Merger(MergerRequest {
        jurisdiction,
        parties,
    });
    let options = EvaluationOptions {
        manual_rates: rate,
        record: !output.no_record,
    };
    evaluate_and_print(&toolkit, request, options, &output).await
}

pub(crate) async fn run_hhi(args: HhiArgs) -> Result<(), AppError> {
    let (_, toolkit) = bootstrap()?;
    if args.firms.len() < MIN_HHI_FIRMS {
        return Err(ToolkitServiceError::from(ValidationError::TooFewEntries {
            field: "firms".to_string(),
            minimum: MIN_HHI_FIRMS,
            found: args.firms.len(),
        })
        .into());
    }

    let firms = args
        .firms
        .into_iter()
        .enumerate()
        .map(|(index, firm)| FirmShare {
            name: if firm.name.is_empty() {
                format!("Firm {}", index + 1)
            } else {
                firm.name
            },
            share: firm.share,
        })
        .collect();

    let request = EvaluationRequest::Hhi(HhiRequest {
        jurisdiction: args.jurisdiction,
        firms,
        normalize: args.normalize,
    });
    let options = EvaluationOptions {
        record: !args.output.no_record,
        ..EvaluationOptions::default()
    };
    evaluate_and_print(&toolkit, request, options, &args.output).await
}

pub(crate) async fn run_checklist(args: ChecklistArgs) -> Result<(), AppError> {
    let (_, toolkit) = bootstrap()?;

    let mut answers: BTreeMap<String, ChecklistAnswer> = toolkit
        .engine()
        .registry()
        .checklist_questions()
        .iter()
        .map(|question| (question.id.clone(), args.default_answer))
        .collect();
    answers.extend(args.answers);

    let request = EvaluationRequest::Checklist(ChecklistRequest {
        jurisdiction: args.jurisdiction,
        answers,
    });
    let options = EvaluationOptions {
        record: !args.output.no_record,
        ..EvaluationOptions::default()
    };
    evaluate_and_print(&toolkit, request, options, &args.output).await
}

pub(crate) async fn run_dominance(args: DominanceArgs) -> Result<(), AppError> {
    let (_, toolkit) = bootstrap()?;
    let request = EvaluationRequest::Dominance(DominanceRequest {
        jurisdiction: args.jurisdiction,
        market_share: Some(args.share),
        market_hhi: args.market_hhi,
        rival_shares: args.rivals,
        vertical_integration: args.vertical_integration,
        network_effects: args.network_effects,
        entry_barriers: args.entry_barriers,
    });
    let options = EvaluationOptions {
        record: !args.output.no_record,
        ..EvaluationOptions::default()
    };
    evaluate_and_print(&toolkit, request, options, &args.output).await
}

pub(crate) fn run_pages() -> Result<(), AppError> {
    let (config, toolkit) = bootstrap()?;
    println!(
        "Calculator pages (default currency {})",
        config.currency.base_currency
    );
    for page in toolkit.pages() {
        println!("\n{} [{}]", page.title, page.page);
        println!("  {}", page.description);
        for field in &page.fields {
            let mut line = format!(
                "  - {} ({}){}",
                field.name,
                field.label,
                if field.required { ", required" } else { "" }
            );
            if let Some(default) = field.default {
                line.push_str(&format!(", default {default}"));
            }
            if !field.choices.is_empty() {
                line.push_str(&format!(", one of {}", field.choices.join("/")));
            }
            println!("{line}");
        }
    }
    Ok(())
}

pub(crate) fn run_registry() -> Result<(), AppError> {
    let (_, toolkit) = bootstrap()?;
    let document = serde_json::to_string_pretty(&toolkit.registry_document())
        .map_err(std::io::Error::from)?;
    println!("{document}");
    Ok(())
}

pub(crate) async fn run_history(command: HistoryCommand) -> Result<(), AppError> {
    let (_, toolkit) = bootstrap()?;
    match command {
        HistoryCommand::List { mode, limit } => {
            let records = toolkit.history(mode, limit).await?;
            if records.is_empty() {
                println!("No saved {} results", mode.title());
                return Ok(());
            }
            println!("Recent {} results", mode.title());
            for record in records {
                println!(
                    "- {} {} {} ({})",
                    record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                    record.result.label(),
                    score_text(&record.result),
                    record.result.jurisdiction
                );
            }
        }
        HistoryCommand::Summary { mode } => {
            let summary = toolkit.history_summary(mode).await?;
            println!("{}", mode.title());
            println!("Saved results: {}", summary.total);
            if let Some(last) = summary.last_recorded_at {
                println!("Last calculation: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if let Some(most_common) = summary.most_common {
                println!("Most common outcome: {most_common}");
            }
        }
        HistoryCommand::Export { mode, output } => {
            let csv = toolkit.export_history(mode).await?;
            write_or_print(&csv, output.as_ref())?;
        }
        HistoryCommand::Clear { mode } => {
            let removed = toolkit.clear_history(mode).await?;
            println!("Removed {removed} saved {} results", mode.title());
        }
    }
    Ok(())
}

async fn evaluate_and_print(
    toolkit: &Toolkit,
    request: EvaluationRequest,
    options: EvaluationOptions,
    output: &OutputArgs,
) -> Result<(), AppError> {
    let result = toolkit.evaluate(request, &options).await?;
    let body = render(toolkit, &result, output.format)?;
    write_or_print(&body, output.output.as_ref())
}

pub(crate) fn render(
    toolkit: &Toolkit,
    result: &EvaluationResult,
    format: OutputFormat,
) -> Result<String, AppError> {
    let body = match format {
        OutputFormat::Text => {
            let mut report = toolkit.export_result(result, ReportFormat::Text)?;
            if result.mode == CalculationMode::Merger {
                if let Some(line) = threshold_line(toolkit, &result.jurisdiction) {
                    report.push_str(&format!("Thresholds: {line}\n"));
                }
            }
            report
        }
        OutputFormat::Csv => toolkit.export_result(result, ReportFormat::Csv)?,
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).map_err(std::io::Error::from)? + "\n"
        }
    };
    Ok(body)
}

fn score_text(result: &EvaluationResult) -> String {
    match (result.mode, result.numeric_score) {
        (CalculationMode::Hhi, Some(score)) => format!("HHI {score:.0}"),
        (_, Some(score)) => format!("score {score:.2}"),
        (_, None) => String::new(),
    }
}

fn write_or_print(body: &str, path: Option<&PathBuf>) -> Result<(), AppError> {
    match path {
        Some(path) => {
            fs::write(path, body)?;
            println!("Saved to {}", path.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}

/// Threshold figures for display next to a merger result.
fn threshold_line(toolkit: &Toolkit, jurisdiction: &str) -> Option<String> {
    let thresholds = toolkit.engine().registry().merger_thresholds(jurisdiction)?;
    Some(format!(
        "{}: global {} / local {}",
        thresholds.description,
        format_currency(thresholds.global_threshold, &thresholds.currency),
        format_currency(thresholds.local_threshold, &thresholds.currency)
    ))
}
