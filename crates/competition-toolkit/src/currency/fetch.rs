use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CurrencyCode, RateTable};

/// Source of live exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable, RateFetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RateFetchError {
    #[error("rate request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate service rejected the request: {0}")]
    Rejected(String),
    #[error("rate service returned base {found}, expected {expected}")]
    UnexpectedBase {
        expected: CurrencyCode,
        found: String,
    },
    #[error("rate request timed out after {0:?}")]
    Timeout(Duration),
}

/// Client for the open.er-api.com `latest` endpoint.
#[derive(Debug, Clone)]
pub struct OpenErApiProvider {
    api_url: String,
    client: reqwest::Client,
}

impl OpenErApiProvider {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, RateFetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            client,
        })
    }

    fn endpoint(&self, base: &CurrencyCode) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), base)
    }
}

#[async_trait]
impl RateProvider for OpenErApiProvider {
    async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable, RateFetchError> {
        let url = self.endpoint(base);
        debug!(%url, "fetching exchange rates");

        let payload: LatestRatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        payload.into_table(base)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default)]
    rates: BTreeMap<String, f64>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
}

impl LatestRatesResponse {
    fn into_table(self, base: &CurrencyCode) -> Result<RateTable, RateFetchError> {
        if self.result != "success" {
            return Err(RateFetchError::Rejected(
                self.error_type.unwrap_or(self.result),
            ));
        }

        if let Some(found) = self.base_code {
            if !found.eq_ignore_ascii_case(base.as_str()) {
                return Err(RateFetchError::UnexpectedBase {
                    expected: base.clone(),
                    found,
                });
            }
        }

        // Codes the service knows but we cannot parse are dropped.
        let rates = self
            .rates
            .into_iter()
            .filter_map(|(code, rate)| CurrencyCode::parse(&code).ok().map(|code| (code, rate)))
            .collect();

        Ok(RateTable::new(base.clone(), rates, "open.er-api.com"))
    }
}

/// Fetch a table within `timeout`. Failures are logged and yield `None` so
/// callers can fall back to manual rates instead of blocking.
pub async fn fetch_with_timeout<P>(
    provider: &P,
    base: &CurrencyCode,
    timeout: Duration,
) -> Option<RateTable>
where
    P: RateProvider + ?Sized,
{
    let outcome = match tokio::time::timeout(timeout, provider.fetch(base)).await {
        Ok(result) => result,
        Err(_) => Err(RateFetchError::Timeout(timeout)),
    };

    match outcome {
        Ok(table) => Some(table),
        Err(err) => {
            warn!(base = %base, error = %err, "exchange rate fetch failed; manual rates required");
            None
        }
    }
}
