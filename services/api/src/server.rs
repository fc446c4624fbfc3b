use crate::cli::ServeArgs;
use crate::infra::{build_toolkit, AppState};
use crate::routes::with_toolkit_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use competition_toolkit::config::AppConfig;
use competition_toolkit::error::AppError;
use competition_toolkit::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let toolkit = build_toolkit(&config)?;

    let app = with_toolkit_routes(toolkit)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        base_currency = %config.currency.base_currency,
        history_dir = %config.storage.history_dir.display(),
        "competition toolkit ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
