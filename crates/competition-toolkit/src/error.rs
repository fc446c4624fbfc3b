use crate::config::ConfigError;
use crate::currency::RateFetchError;
use crate::history::HistoryError;
use crate::registry::RegistryError;
use crate::service::ToolkitServiceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Registry(RegistryError),
    History(HistoryError),
    Rates(RateFetchError),
    Toolkit(ToolkitServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Registry(err) => write!(f, "registry error: {}", err),
            AppError::History(err) => write!(f, "history error: {}", err),
            AppError::Rates(err) => write!(f, "exchange rate error: {}", err),
            AppError::Toolkit(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Registry(err) => Some(err),
            AppError::History(err) => Some(err),
            AppError::Rates(err) => Some(err),
            AppError::Toolkit(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Toolkit(ToolkitServiceError::Validation(_))
            | AppError::Toolkit(ToolkitServiceError::Conversion(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Rates(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Registry(_)
            | AppError::History(_)
            | AppError::Toolkit(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RegistryError> for AppError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<HistoryError> for AppError {
    fn from(value: HistoryError) -> Self {
        Self::History(value)
    }
}

impl From<RateFetchError> for AppError {
    fn from(value: RateFetchError) -> Self {
        Self::Rates(value)
    }
}

impl From<ToolkitServiceError> for AppError {
    fn from(value: ToolkitServiceError) -> Self {
        Self::Toolkit(value)
    }
}
