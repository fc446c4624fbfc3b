use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::CurrencyConfig;
use crate::currency::{
    fetch_with_timeout, ConversionError, CurrencyCode, CurrencyConverter, ManualRate,
    RateOrigin, RateProvider,
};
use crate::evaluation::{
    CalculationMode, EvaluationEngine, EvaluationRequest, EvaluationResult, MergerRequest,
    ValidationError,
};
use crate::export::{history_csv, ExportError, ReportFormat};
use crate::history::{HistoryError, HistoryRecord, HistoryStore, HistorySummary};
use crate::pages::{PageCatalog, PageId, PageSchema};
use crate::registry::{normalize_jurisdiction, RegistryDocument, ThresholdRegistry};

/// Per-request knobs that sit outside the calculator inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationOptions {
    #[serde(default)]
    pub manual_rates: Vec<ManualRate>,
    /// Append the result to the calculator's history.
    #[serde(default = "record_by_default")]
    pub record: bool,
}

fn record_by_default() -> bool {
    true
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            manual_rates: Vec::new(),
            record: true,
        }
    }
}

/// Composes currency normalisation, the evaluation engine and history.
pub struct ToolkitService<H, P> {
    engine: Arc<EvaluationEngine>,
    converter: CurrencyConverter,
    pages: PageCatalog,
    history: Arc<H>,
    rates: Arc<P>,
    rate_timeout: Duration,
}

impl<H, P> ToolkitService<H, P>
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    pub fn new(
        registry: Arc<ThresholdRegistry>,
        currency: &CurrencyConfig,
        history: Arc<H>,
        rates: Arc<P>,
    ) -> Self {
        Self {
            engine: Arc::new(EvaluationEngine::new(registry)),
            converter: CurrencyConverter::new(currency.supported.clone()),
            pages: PageCatalog::new(currency.base_currency.clone()),
            history,
            rates,
            rate_timeout: currency.rate_timeout,
        }
    }

    pub fn engine(&self) -> &EvaluationEngine {
        &self.engine
    }

    pub fn supported_currencies(&self) -> &[CurrencyCode] {
        self.converter.supported()
    }

    /// Normalise currencies, evaluate, and record the result.
    pub async fn evaluate(
        &self,
        mut request: EvaluationRequest,
        options: &EvaluationOptions,
    ) -> Result<EvaluationResult, ToolkitServiceError> {
        if let EvaluationRequest::Merger(merger) = &mut request {
            self.normalize_currencies(merger, &options.manual_rates)
                .await?;
        }

        let result = self.engine.evaluate(&request)?;

        if options.record {
            let recorded = result.clone();
            let record = self
                .with_history(move |history| history.append(&recorded))
                .await?;
            debug!(id = %record.id, "evaluation recorded");
        }

        info!(
            mode = %result.mode,
            jurisdiction = %result.jurisdiction,
            classification = result.label(),
            score = ?result.numeric_score,
            "evaluation completed"
        );
        Ok(result)
    }

    /// Parse a page form and evaluate it.
    pub async fn submit_page(
        &self,
        page: PageId,
        form: &Map<String, Value>,
        options: &EvaluationOptions,
    ) -> Result<EvaluationResult, ToolkitServiceError> {
        let request = self.pages.parse(page, form)?;
        self.evaluate(request, options).await
    }

    pub fn pages(&self) -> Vec<PageSchema> {
        self.pages.pages()
    }

    pub fn registry_document(&self) -> RegistryDocument {
        self.engine.registry().document()
    }

    /// Newest first.
    pub async fn history(
        &self,
        mode: CalculationMode,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, ToolkitServiceError> {
        self.with_history(move |history| history.recent(mode, limit))
            .await
    }

    pub async fn history_summary(
        &self,
        mode: CalculationMode,
    ) -> Result<HistorySummary, ToolkitServiceError> {
        self.with_history(move |history| history.summary(mode))
            .await
    }

    pub async fn clear_history(
        &self,
        mode: CalculationMode,
    ) -> Result<usize, ToolkitServiceError> {
        let removed = self
            .with_history(move |history| history.clear(mode))
            .await?;
        info!(mode = %mode, removed, "history cleared");
        Ok(removed)
    }

    /// Every record for `mode` as CSV, oldest first.
    pub async fn export_history(
        &self,
        mode: CalculationMode,
    ) -> Result<String, ToolkitServiceError> {
        let records = self
            .with_history(move |history| history.load(mode))
            .await?;
        Ok(history_csv(&records)?)
    }

    /// Stores do blocking file I/O, so they run off the async workers.
    async fn with_history<T, F>(&self, operation: F) -> Result<T, ToolkitServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&H) -> Result<T, HistoryError> + Send + 'static,
    {
        let history = Arc::clone(&self.history);
        let outcome = tokio::task::spawn_blocking(move || operation(history.as_ref()))
            .await
            .map_err(HistoryError::from)?;
        Ok(outcome?)
    }

    pub fn export_result(
        &self,
        result: &EvaluationResult,
        format: ReportFormat,
    ) -> Result<String, ToolkitServiceError> {
        Ok(format.render(result)?)
    }

    /// Convert every turnover into the threshold currency. Live rates are
    /// fetched only when the manual rates do not cover a pair.
    async fn normalize_currencies(
        &self,
        request: &mut MergerRequest,
        manual_rates: &[ManualRate],
    ) -> Result<(), ToolkitServiceError> {
        let jurisdiction = normalize_jurisdiction(&request.jurisdiction);
        let Some(thresholds) = self.engine.registry().merger_thresholds(&jurisdiction) else {
            // Left to the engine, which reports the unknown jurisdiction.
            return Ok(());
        };
        let target = thresholds.currency.clone();

        let needs_table = request.parties.iter().any(|party| {
            party.turnover.as_ref().is_some_and(|money| {
                !self
                    .converter
                    .covered_without_table(&money.currency, &target, manual_rates)
            })
        });
        let table = if needs_table {
            fetch_with_timeout(self.rates.as_ref(), &target, self.rate_timeout).await
        } else {
            None
        };

        for party in &mut request.parties {
            let Some(money) = &party.turnover else {
                continue;
            };
            let conversion =
                self.converter
                    .convert(money, &target, table.as_ref(), manual_rates)?;
            if conversion.origin != RateOrigin::SameCurrency {
                debug!(
                    party = %party.name,
                    from = %conversion.original.currency,
                    to = %target,
                    rate = conversion.rate,
                    origin = conversion.origin.label(),
                    "turnover converted"
                );
                party.turnover = Some(conversion.converted.clone());
                party.conversion = Some(conversion);
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolkitServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{Money, RateFetchError, RateTable};
    use crate::evaluation::{FirmShare, HhiRequest, MergerParty, PartyRole};
    use crate::history::MemoryHistoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn code(raw: &str) -> CurrencyCode {
        CurrencyCode::parse(raw).expect("valid code")
    }

    /// Quotes one EUR at 32 TRY and counts how often it is asked.
    #[derive(Default)]
    struct CountingRates {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateProvider for CountingRates {
        async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable, RateFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut rates = BTreeMap::new();
            rates.insert(code("EUR"), 0.03125);
            rates.insert(code("USD"), 0.03125);
            Ok(RateTable::new(base.clone(), rates, "stub"))
        }
    }

    struct OfflineRates;

    #[async_trait]
    impl RateProvider for OfflineRates {
        async fn fetch(&self, _base: &CurrencyCode) -> Result<RateTable, RateFetchError> {
            Err(RateFetchError::Rejected("offline".to_string()))
        }
    }

    fn currency_config() -> CurrencyConfig {
        CurrencyConfig {
            base_currency: code("TRY"),
            supported: vec![code("TRY"), code("EUR"), code("USD")],
            rate_api_url: "http://127.0.0.1:9".to_string(),
            rate_timeout: Duration::from_secs(1),
        }
    }

    fn service<P: RateProvider + 'static>(
        rates: Arc<P>,
    ) -> (ToolkitService<MemoryHistoryStore, P>, Arc<MemoryHistoryStore>) {
        let history = Arc::new(MemoryHistoryStore::default());
        let service = ToolkitService::new(
            Arc::new(ThresholdRegistry::standard()),
            &currency_config(),
            Arc::clone(&history),
            rates,
        );
        (service, history)
    }

    fn party(role: PartyRole, amount: f64, currency: &str) -> MergerParty {
        MergerParty {
            name: format!("{} Co", role.label()),
            role,
            turnover: Some(Money::new(amount, code(currency))),
            conversion: None,
        }
    }

    fn merger(parties: Vec<MergerParty>) -> EvaluationRequest {
        EvaluationRequest::Merger(MergerRequest {
            jurisdiction: "Turkish".to_string(),
            parties,
        })
    }

    #[tokio::test]
    async fn threshold_currency_needs_no_rates() {
        let rates = Arc::new(CountingRates::default());
        let (service, history) = service(Arc::clone(&rates));

        let result = service
            .evaluate(
                merger(vec![
                    party(PartyRole::Acquirer, 400_000_000.0, "TRY"),
                    party(PartyRole::Target, 200_000_000.0, "TRY"),
                ]),
                &EvaluationOptions::default(),
            )
            .await
            .expect("evaluates");

        assert_eq!(result.label(), "Notification required");
        assert_eq!(rates.calls.load(Ordering::SeqCst), 0);
        assert_eq!(history.load(CalculationMode::Merger).expect("load").len(), 1);
    }

    #[tokio::test]
    async fn foreign_turnover_is_converted_with_live_rates() {
        let rates = Arc::new(CountingRates::default());
        let (service, _) = service(Arc::clone(&rates));

        let result = service
            .evaluate(
                merger(vec![
                    party(PartyRole::Acquirer, 20_000_000.0, "EUR"),
                    party(PartyRole::Target, 60_000_000.0, "TRY"),
                ]),
                &EvaluationOptions::default(),
            )
            .await
            .expect("evaluates");

        assert_eq!(rates.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.numeric_score, Some(2.0));
        let reported = result
            .input("parties[0].reported_turnover")
            .expect("conversion is recorded")
            .to_string();
        assert!(reported.contains("EUR"), "{reported}");
        assert!(reported.contains("live rate"), "{reported}");
        assert!(result.input("parties[1].reported_turnover").is_none());
    }

    #[tokio::test]
    async fn manual_rates_skip_the_fetch() {
        let rates = Arc::new(CountingRates::default());
        let (service, _) = service(Arc::clone(&rates));
        let options = EvaluationOptions {
            manual_rates: vec![ManualRate {
                from: code("EUR"),
                to: code("TRY"),
                rate: 2.0,
            }],
            record: false,
        };

        let result = service
            .evaluate(
                merger(vec![
                    party(PartyRole::Acquirer, 10_000_000.0, "EUR"),
                    party(PartyRole::Target, 5_000_000.0, "TRY"),
                ]),
                &options,
            )
            .await
            .expect("evaluates");

        assert_eq!(rates.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.label(), "Notification not required");
    }

    #[tokio::test]
    async fn missing_rates_fail_instead_of_assuming_parity() {
        let (service, history) = service(Arc::new(OfflineRates));

        let err = service
            .evaluate(
                merger(vec![
                    party(PartyRole::Acquirer, 20_000_000.0, "USD"),
                    party(PartyRole::Target, 1.0, "TRY"),
                ]),
                &EvaluationOptions::default(),
            )
            .await
            .expect_err("no rate available");

        assert!(matches!(
            err,
            ToolkitServiceError::Conversion(ConversionError::Unavailable { .. })
        ));
        assert!(history.load(CalculationMode::Merger).expect("load").is_empty());
    }

    #[tokio::test]
    async fn unsupported_currency_is_rejected() {
        let (service, _) = service(Arc::new(OfflineRates));

        let err = service
            .evaluate(
                merger(vec![
                    party(PartyRole::Acquirer, 1.0, "GBP"),
                    party(PartyRole::Target, 1.0, "TRY"),
                ]),
                &EvaluationOptions::default(),
            )
            .await
            .expect_err("GBP is not configured");

        assert!(matches!(
            err,
            ToolkitServiceError::Conversion(ConversionError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn skipped_recording_leaves_history_untouched() {
        let (service, history) = service(Arc::new(OfflineRates));
        let request = EvaluationRequest::Hhi(HhiRequest {
            jurisdiction: "general".to_string(),
            firms: vec![
                FirmShare {
                    name: "A".to_string(),
                    share: 50.0,
                },
                FirmShare {
                    name: "B".to_string(),
                    share: 50.0,
                },
            ],
            normalize: false,
        });

        let options = EvaluationOptions {
            record: false,
            ..EvaluationOptions::default()
        };
        let result = service.evaluate(request, &options).await.expect("evaluates");

        assert_eq!(result.numeric_score, Some(5000.0));
        assert!(history.load(CalculationMode::Hhi).expect("load").is_empty());
    }

    #[tokio::test]
    async fn submitted_pages_feed_history_exports() {
        let (service, _) = service(Arc::new(OfflineRates));
        let form = json!({
            "firms": [
                { "name": "Alpha", "share": "40" },
                { "name": "Beta", "share": 30 },
                { "name": "Gamma", "share": 30 }
            ]
        });
        let form = form.as_object().expect("object");

        let result = service
            .submit_page(PageId::HhiCalculator, form, &EvaluationOptions::default())
            .await
            .expect("page evaluates");
        assert_eq!(result.numeric_score, Some(3400.0));

        let summary = service
            .history_summary(CalculationMode::Hhi)
            .await
            .expect("summary");
        assert_eq!(summary.total, 1);
        assert_eq!(summary.most_common.as_deref(), Some("Highly concentrated"));

        let csv = service
            .export_history(CalculationMode::Hhi)
            .await
            .expect("csv");
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("3400"));

        assert_eq!(
            service
                .clear_history(CalculationMode::Hhi)
                .await
                .expect("clear"),
            1
        );
        assert!(service
            .history(CalculationMode::Hhi, 5)
            .await
            .expect("history")
            .is_empty());
    }

    #[tokio::test]
    async fn page_validation_errors_name_the_field() {
        let (service, _) = service(Arc::new(OfflineRates));
        let form = json!({ "firms": [{ "share": 60 }, { "share": "lots" }] });

        let err = service
            .submit_page(
                PageId::HhiCalculator,
                form.as_object().expect("object"),
                &EvaluationOptions::default(),
            )
            .await
            .expect_err("invalid share");

        match err {
            ToolkitServiceError::Validation(error) => {
                assert_eq!(error.field(), Some("firms[1].share"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Blocks every read until the test opens the gate.
    struct GatedHistory {
        gate: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl HistoryStore for GatedHistory {
        fn append(&self, result: &EvaluationResult) -> Result<HistoryRecord, HistoryError> {
            Ok(HistoryRecord::new(result.clone(), chrono::Utc::now()))
        }

        fn load(&self, _mode: CalculationMode) -> Result<Vec<HistoryRecord>, HistoryError> {
            self.gate
                .lock()
                .expect("gate mutex poisoned")
                .recv_timeout(Duration::from_secs(5))
                .map(|_| Vec::new())
                .map_err(|err| HistoryError::Io {
                    path: "gated".into(),
                    source: std::io::Error::new(std::io::ErrorKind::TimedOut, err),
                })
        }

        fn clear(&self, _mode: CalculationMode) -> Result<usize, HistoryError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn history_reads_leave_the_runtime_free() {
        let (release, gate) = std::sync::mpsc::channel();
        let service = ToolkitService::new(
            Arc::new(ThresholdRegistry::standard()),
            &currency_config(),
            Arc::new(GatedHistory {
                gate: std::sync::Mutex::new(gate),
            }),
            Arc::new(OfflineRates),
        );

        // Runs on the same single-threaded runtime as the read below.
        let opener = tokio::spawn(async move {
            release.send(()).expect("gate receiver alive");
        });

        let records = service
            .history(CalculationMode::Hhi, 5)
            .await
            .expect("read completes once the gate opens");
        assert!(records.is_empty());
        opener.await.expect("opener task");
    }
}
