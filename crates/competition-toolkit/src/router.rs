use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::currency::RateProvider;
use crate::evaluation::{CalculationMode, EvaluationRequest, EvaluationResult, ValidationError};
use crate::export::ReportFormat;
use crate::history::{HistoryStore, DEFAULT_RECENT_LIMIT};
use crate::pages::PageId;
use crate::service::{EvaluationOptions, ToolkitService, ToolkitServiceError};

#[derive(Debug, Deserialize)]
pub struct EvaluateBody {
    pub request: EvaluationRequest,
    #[serde(default)]
    pub options: EvaluationOptions,
}

/// A page form: the page's fields at the top level plus optional `options`.
#[derive(Debug, Deserialize)]
pub struct PageSubmission {
    #[serde(default)]
    pub options: EvaluationOptions,
    #[serde(flatten)]
    pub form: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// HTTP surface for the calculators, pages, registry and history.
pub fn toolkit_router<H, P>(service: Arc<ToolkitService<H, P>>) -> Router
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    Router::new()
        .route("/api/v1/evaluate", post(evaluate_handler::<H, P>))
        .route("/api/v1/export/:format", post(export_handler::<H, P>))
        .route("/api/v1/pages", get(pages_handler::<H, P>))
        .route("/api/v1/pages/:page", post(submit_page_handler::<H, P>))
        .route("/api/v1/registry", get(registry_handler::<H, P>))
        .route(
            "/api/v1/history/:mode",
            get(history_handler::<H, P>).delete(clear_history_handler::<H, P>),
        )
        .route(
            "/api/v1/history/:mode/summary",
            get(history_summary_handler::<H, P>),
        )
        .route(
            "/api/v1/history/:mode/export",
            get(history_export_handler::<H, P>),
        )
        .with_state(service)
}

pub(crate) async fn evaluate_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
    axum::Json(body): axum::Json<EvaluateBody>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    match service.evaluate(body.request, &body.options).await {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
    Path(format): Path<String>,
    axum::Json(result): axum::Json<EvaluationResult>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    let format = match format.parse::<ReportFormat>() {
        Ok(format) => format,
        Err(message) => {
            return (StatusCode::NOT_FOUND, axum::Json(json!({ "error": message })))
                .into_response()
        }
    };

    match service.export_result(&result, format) {
        Ok(body) => {
            let extension = match format {
                ReportFormat::Csv => "csv",
                ReportFormat::Text => "txt",
            };
            let disposition = format!(
                "attachment; filename=\"{}_{}.{extension}\"",
                result.mode.history_key(),
                result.timestamp.format("%Y%m%d_%H%M%S")
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, format.content_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn pages_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    let payload = json!({
        "pages": service.pages(),
        "currencies": service.supported_currencies(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_page_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
    Path(page): Path<String>,
    axum::Json(submission): axum::Json<PageSubmission>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    let page = match page.parse::<PageId>() {
        Ok(page) => page,
        Err(error) => return not_found(error),
    };

    match service
        .submit_page(page, &submission.form, &submission.options)
        .await
    {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn registry_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    (StatusCode::OK, axum::Json(service.registry_document())).into_response()
}

pub(crate) async fn history_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
    Path(mode): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    let mode = match mode.parse::<CalculationMode>() {
        Ok(mode) => mode,
        Err(error) => return not_found(error),
    };

    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    match service.history(mode, limit).await {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn clear_history_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
    Path(mode): Path<String>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    let mode = match mode.parse::<CalculationMode>() {
        Ok(mode) => mode,
        Err(error) => return not_found(error),
    };

    match service.clear_history(mode).await {
        Ok(removed) => {
            let payload = json!({ "mode": mode, "removed": removed });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_summary_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
    Path(mode): Path<String>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    let mode = match mode.parse::<CalculationMode>() {
        Ok(mode) => mode,
        Err(error) => return not_found(error),
    };

    match service.history_summary(mode).await {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_export_handler<H, P>(
    State(service): State<Arc<ToolkitService<H, P>>>,
    Path(mode): Path<String>,
) -> Response
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    let mode = match mode.parse::<CalculationMode>() {
        Ok(mode) => mode,
        Err(error) => return not_found(error),
    };

    match service.export_history(mode).await {
        Ok(csv) => {
            let disposition = format!(
                "attachment; filename=\"{}_history.csv\"",
                mode.history_key()
            );
            (
                StatusCode::OK,
                [
                    (
                        header::CONTENT_TYPE,
                        ReportFormat::Csv.content_type().to_string(),
                    ),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response()
        }
        Err(error) => error_response(error),
    }
}

fn not_found(error: ValidationError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn error_response(error: ToolkitServiceError) -> Response {
    match error {
        ToolkitServiceError::Validation(error) => {
            let payload = json!({
                "error": error.to_string(),
                "field": error.field(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        ToolkitServiceError::Conversion(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        other => {
            tracing::error!(error = %other, "toolkit request failed");
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
