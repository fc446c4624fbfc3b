//! Competition-law calculators: merger notification thresholds, HHI market
//! concentration, compliance checklist scoring and dominance risk.
//!
//! Every calculator runs through the [`evaluation::EvaluationEngine`], which
//! classifies a score against the bands held by the read-only
//! [`registry::ThresholdRegistry`]. Currency normalisation, history and export
//! live in their own adapters so the engine itself stays free of I/O.

pub mod config;
pub mod currency;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod history;
pub mod pages;
pub mod registry;
pub mod router;
pub mod service;
pub mod telemetry;

/// Shown on every report and export; the calculators are heuristics.
pub const DISCLAIMER: &str = "This tool is for educational purposes only. Always consult qualified legal counsel for competition law matters.";
