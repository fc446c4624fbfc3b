use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use competition_toolkit::currency::RateProvider;
use competition_toolkit::history::HistoryStore;
use competition_toolkit::router::toolkit_router;
use competition_toolkit::service::ToolkitService;
use competition_toolkit::DISCLAIMER;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_toolkit_routes<H, P>(service: Arc<ToolkitService<H, P>>) -> axum::Router
where
    H: HistoryStore + 'static,
    P: RateProvider + 'static,
{
    toolkit_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "disclaimer": DISCLAIMER }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
