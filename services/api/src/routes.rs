use crate::infra::{AppState, QuoteRequest};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use package_scoping::error::AppError;
use package_scoping::scoping::{
    scoping_router, AuditLog, ScopingCalculationResult, ScopingRepository, ScopingService,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct QuotePreviewResponse {
    #[serde(flatten)]
    pub(crate) result: ScopingCalculationResult,
    pub(crate) summary: String,
    pub(crate) quoted_at: DateTime<Utc>,
}

pub(crate) fn with_scoping_routes<R, L>(service: Arc<ScopingService<R, L>>) -> axum::Router
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    scoping_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/quotes/preview",
            axum::routing::post(quote_preview_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
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

/// Price an ad hoc baseline and rule set without touching the catalog.
pub(crate) async fn quote_preview_endpoint(
    Extension(state): Extension<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuotePreviewResponse>, AppError> {
    let rules = request.build_rules()?;
    let result = state
        .engine
        .calculate(&request.baseline, &rules, &request.answers)?;
    let summary = result.summary();

    Ok(Json(QuotePreviewResponse {
        result,
        summary,
        quoted_at: Utc::now(),
    }))
}
