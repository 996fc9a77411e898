use crate::cli::ServeArgs;
use crate::infra::{demo_service, AppState};
use crate::routes::with_scoping_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use package_scoping::config::AppConfig;
use package_scoping::error::AppError;
use package_scoping::scoping::ScopingEngine;
use package_scoping::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: Arc::new(ScopingEngine::new(config.engine)),
    };

    let (scoping_service, _audit, package_id) = demo_service(config.engine)?;

    let app = with_scoping_routes(scoping_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        currency_scale = config.engine.currency_scale,
        demo_package = %package_id,
        "package scoping service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
