use competition_toolkit::config::AppConfig;
use competition_toolkit::currency::{CurrencyCode, ManualRate, OpenErApiProvider};
use competition_toolkit::error::AppError;
use competition_toolkit::evaluation::{ChecklistAnswer, FirmShare};
use competition_toolkit::history::JsonlHistoryStore;
use competition_toolkit::registry::ThresholdRegistry;
use competition_toolkit::service::ToolkitService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service wired to the on-disk history and the live rate API.
pub(crate) type Toolkit = ToolkitService<JsonlHistoryStore, OpenErApiProvider>;

pub(crate) fn build_toolkit(config: &AppConfig) -> Result<Arc<Toolkit>, AppError> {
    let registry = ThresholdRegistry::load(config.registry_path.as_deref())?;
    config.currency.ensure_threshold_currencies(&registry)?;
    info!(
        version = registry.version(),
        custom = config.registry_path.is_some(),
        "threshold registry ready"
    );

    let history = JsonlHistoryStore::new(&config.storage.history_dir)?;
    let rates = OpenErApiProvider::new(
        config.currency.rate_api_url.clone(),
        config.currency.rate_timeout,
    )?;

    Ok(Arc::new(ToolkitService::new(
        Arc::new(registry),
        &config.currency,
        Arc::new(history),
        Arc::new(rates),
    )))
}

/// `NAME=AMOUNT[:CUR]`, e.g. `Acme=600000000:TRY`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PartyArg {
    pub(crate) name: String,
    pub(crate) amount: f64,
    pub(crate) currency: Option<CurrencyCode>,
}

pub(crate) fn parse_party(raw: &str) -> Result<PartyArg, String> {
    let (name, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=AMOUNT[:CUR], got '{raw}'"))?;
    let (amount, currency) = match rest.split_once(':') {
        Some((amount, currency)) => {
            let code = CurrencyCode::parse(currency).map_err(|err| err.to_string())?;
            (amount, Some(code))
        }
        None => (rest, None),
    };

    Ok(PartyArg {
        name: name.trim().to_string(),
        amount: parse_number(amount)?,
        currency,
    })
}

/// `NAME=SHARE`, or a bare share.
pub(crate) fn parse_firm(raw: &str) -> Result<FirmShare, String> {
    match raw.split_once('=') {
        Some((name, share)) => Ok(FirmShare {
            name: name.trim().to_string(),
            share: parse_number(share)?,
        }),
        None => Ok(FirmShare {
            name: String::new(),
            share: parse_number(raw)?,
        }),
    }
}

/// `QUESTION=ANSWER`, e.g. `bid_rigging=sometimes`.
pub(crate) fn parse_answer(raw: &str) -> Result<(String, ChecklistAnswer), String> {
    let (id, answer) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=ANSWER, got '{raw}'"))?;
    let answer = answer
        .parse::<ChecklistAnswer>()
        .map_err(|_| format!("answer for '{id}' must be no, sometimes or yes"))?;
    Ok((id.trim().to_string(), answer))
}

/// `FROM:TO=RATE`, e.g. `EUR:TRY=35.2`.
pub(crate) fn parse_manual_rate(raw: &str) -> Result<ManualRate, String> {
    let (pair, rate) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FROM:TO=RATE, got '{raw}'"))?;
    let (from, to) = pair
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO=RATE, got '{raw}'"))?;

    let rate = parse_number(rate)?;
    if rate <= 0.0 {
        return Err(format!("rate for {pair} must be positive"));
    }

    Ok(ManualRate {
        from: CurrencyCode::parse(from).map_err(|err| err.to_string())?,
        to: CurrencyCode::parse(to).map_err(|err| err.to_string())?,
        rate,
    })
}

fn parse_number(raw: &str) -> Result<f64, String> {
    raw.trim()
        .replace([',', '_'], "")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("'{}' is not a number", raw.trim()))
}
