use crate::cli::ServeArgs;
use crate::infra::{build_store, AppState};
use crate::routes::with_operational_routes;
use accommodation::config::AppConfig;
use accommodation::error::AppError;
use accommodation::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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
    if let Some(path) = args.estate_csv.take() {
        config.estate.estate_csv = Some(path);
    }
    if let Some(path) = args.postcode_csv.take() {
        config.estate.postcode_districts_csv = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = build_store(&config.estate)?;
    let app = with_operational_routes(store, config.search)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "accommodation api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
