use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::currency::CurrencyCode;
use crate::registry::ThresholdRegistry;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub currency: CurrencyConfig,
    pub storage: StorageConfig,
    /// Registry document to load instead of the built-in tables.
    pub registry_path: Option<PathBuf>,
}

pub const DEFAULT_RATE_API_URL: &str = "https://open.er-api.com/v6/latest";
const DEFAULT_RATE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CURRENCIES: &str = "TRY,EUR,USD";

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let supported = parse_currency_list(
            &env::var("APP_SUPPORTED_CURRENCIES").unwrap_or_else(|_| DEFAULT_CURRENCIES.to_string()),
        )?;
        let base_raw = env::var("APP_BASE_CURRENCY").unwrap_or_else(|_| "TRY".to_string());
        let base_currency = CurrencyCode::parse(&base_raw).map_err(|_| {
            ConfigError::InvalidCurrency {
                variable: "APP_BASE_CURRENCY",
                value: base_raw.clone(),
            }
        })?;
        if !supported.contains(&base_currency) {
            return Err(ConfigError::UnsupportedBaseCurrency(base_currency));
        }

        let rate_api_url =
            env::var("APP_RATE_API_URL").unwrap_or_else(|_| DEFAULT_RATE_API_URL.to_string());
        let rate_timeout = env::var("APP_RATE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_RATE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidTimeout)?;

        let history_dir = env::var("APP_HISTORY_DIR").unwrap_or_else(|_| "data".to_string());
        let registry_path = env::var("APP_REGISTRY_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            currency: CurrencyConfig {
                base_currency,
                supported,
                rate_api_url,
                rate_timeout,
            },
            storage: StorageConfig {
                history_dir: PathBuf::from(history_dir),
            },
            registry_path,
        })
    }
}

fn parse_currency_list(raw: &str) -> Result<Vec<CurrencyCode>, ConfigError> {
    let mut codes = Vec::new();
    for part in raw.split(',').filter(|part| !part.trim().is_empty()) {
        let code = CurrencyCode::parse(part).map_err(|_| ConfigError::InvalidCurrency {
            variable: "APP_SUPPORTED_CURRENCIES",
            value: part.trim().to_string(),
        })?;
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    if codes.is_empty() {
        return Err(ConfigError::EmptyCurrencyList);
    }
    Ok(codes)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Currencies accepted on input and the live rate source.
#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    pub base_currency: CurrencyCode,
    pub supported: Vec<CurrencyCode>,
    pub rate_api_url: String,
    pub rate_timeout: Duration,
}

impl CurrencyConfig {
    /// Merger turnovers are converted into each jurisdiction's threshold
    /// currency, so every one of them must be accepted here.
    pub fn ensure_threshold_currencies(
        &self,
        registry: &ThresholdRegistry,
    ) -> Result<(), ConfigError> {
        match registry
            .all_merger_thresholds()
            .find(|thresholds| !self.supported.contains(&thresholds.currency))
        {
            Some(thresholds) => Err(ConfigError::UnsupportedThresholdCurrency {
                jurisdiction: thresholds.jurisdiction.clone(),
                currency: thresholds.currency.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub history_dir: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCurrency { variable: &'static str, value: String },
    EmptyCurrencyList,
    UnsupportedBaseCurrency(CurrencyCode),
    UnsupportedThresholdCurrency {
        jurisdiction: String,
        currency: CurrencyCode,
    },
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCurrency { variable, value } => {
                write!(f, "{variable} contains '{value}', which is not a currency code")
            }
            ConfigError::EmptyCurrencyList => {
                write!(f, "APP_SUPPORTED_CURRENCIES must list at least one currency")
            }
            ConfigError::UnsupportedBaseCurrency(code) => write!(
                f,
                "APP_BASE_CURRENCY {code} is missing from APP_SUPPORTED_CURRENCIES"
            ),
            ConfigError::UnsupportedThresholdCurrency {
                jurisdiction,
                currency,
            } => write!(
                f,
                "merger thresholds for '{jurisdiction}' use {currency}, which is missing from APP_SUPPORTED_CURRENCIES"
            ),
            ConfigError::InvalidTimeout => {
                write!(f, "APP_RATE_TIMEOUT_SECS must be a positive number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
