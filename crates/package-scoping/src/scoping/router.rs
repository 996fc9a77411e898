use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{FactorId, PackageId, RuleId, ScopingInputs};
use super::drafts::{FactorDraft, RuleDraft};
use super::engine::ScopingError;
use super::repository::{AuditLog, RepositoryError, ScopingRepository};
use super::service::{ScopingService, ScopingServiceError};

/// Header naming the administrator behind a catalog write.
pub const ADMIN_USER_HEADER: &str = "x-admin-user";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub answers: ScopingInputs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub active: bool,
}

/// Router builder exposing the questionnaire, calculation and admin endpoints.
pub fn scoping_router<R, L>(service: Arc<ScopingService<R, L>>) -> Router
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    Router::new()
        .route(
            "/api/v1/packages/:package_id/scoping/factors",
            axum::routing::get(questionnaire_handler::<R, L>).post(create_factor_handler::<R, L>),
        )
        .route(
            "/api/v1/packages/:package_id/scoping/calculate",
            post(calculate_handler::<R, L>),
        )
        .route(
            "/api/v1/packages/:package_id/scoping/rules",
            post(create_rule_handler::<R, L>),
        )
        .route(
            "/api/v1/scoping/factors/:factor_id",
            put(update_factor_handler::<R, L>).delete(delete_factor_handler::<R, L>),
        )
        .route(
            "/api/v1/scoping/factors/:factor_id/active",
            put(factor_activation_handler::<R, L>),
        )
        .route(
            "/api/v1/scoping/rules/:rule_id",
            put(update_rule_handler::<R, L>).delete(delete_rule_handler::<R, L>),
        )
        .route(
            "/api/v1/scoping/rules/:rule_id/active",
            put(rule_activation_handler::<R, L>),
        )
        .with_state(service)
}

pub(crate) async fn questionnaire_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(package_id): Path<String>,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    match service.questionnaire(&PackageId(package_id)) {
        Ok(factors) => (StatusCode::OK, axum::Json(factors)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn calculate_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(package_id): Path<String>,
    axum::Json(request): axum::Json<CalculateRequest>,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    match service.calculate(&PackageId(package_id), &request.answers) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_factor_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(package_id): Path<String>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<FactorDraft>,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    let Some(actor) = admin_user(&headers) else {
        return unauthorized();
    };
    match service.create_factor(actor, &PackageId(package_id), draft) {
        Ok(factor) => (StatusCode::CREATED, axum::Json(factor)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_factor_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(factor_id): Path<String>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<FactorDraft>,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    let Some(actor) = admin_user(&headers) else {
        return unauthorized();
    };
    match service.update_factor(actor, &FactorId(factor_id), draft) {
        Ok(factor) => (StatusCode::OK, axum::Json(factor)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn factor_activation_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(factor_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ActivationRequest>,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    let Some(actor) = admin_user(&headers) else {
        return unauthorized();
    };
    match service.set_factor_active(actor, &FactorId(factor_id), request.active) {
        Ok(factor) => (StatusCode::OK, axum::Json(factor)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_factor_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(factor_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    let Some(actor) = admin_user(&headers) else {
        return unauthorized();
    };
    match service.delete_factor(actor, &FactorId(factor_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_rule_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(package_id): Path<String>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<RuleDraft>,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    let Some(actor) = admin_user(&headers) else {
        return unauthorized();
    };
    match service.create_rule(actor, &PackageId(package_id), draft) {
        Ok(rule) => (StatusCode::CREATED, axum::Json(rule)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_rule_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(rule_id): Path<String>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<RuleDraft>,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    let Some(actor) = admin_user(&headers) else {
        return unauthorized();
    };
    match service.update_rule(actor, &RuleId(rule_id), draft) {
        Ok(rule) => (StatusCode::OK, axum::Json(rule)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rule_activation_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(rule_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ActivationRequest>,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    let Some(actor) = admin_user(&headers) else {
        return unauthorized();
    };
    match service.set_rule_active(actor, &RuleId(rule_id), request.active) {
        Ok(rule) => (StatusCode::OK, axum::Json(rule)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_rule_handler<R, L>(
    State(service): State<Arc<ScopingService<R, L>>>,
    Path(rule_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    let Some(actor) = admin_user(&headers) else {
        return unauthorized();
    };
    match service.delete_rule(actor, &RuleId(rule_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

fn admin_user(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn unauthorized() -> Response {
    let payload = json!({
        "error": format!("missing {ADMIN_USER_HEADER} header"),
    });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

/// HTTP status for a service error.
pub fn error_status(error: &ScopingServiceError) -> StatusCode {
    match error {
        ScopingServiceError::Scoping(ScopingError::PackageNotFound(_))
        | ScopingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ScopingServiceError::Repository(RepositoryError::Conflict)
        | ScopingServiceError::DuplicateFactorKey { .. } => StatusCode::CONFLICT,
        ScopingServiceError::Scoping(_)
        | ScopingServiceError::Answer(_)
        | ScopingServiceError::RuleDraft(_)
        | ScopingServiceError::FactorDraft(_)
        | ScopingServiceError::UnknownFactorKey { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ScopingServiceError::MissingActor => StatusCode::UNAUTHORIZED,
        ScopingServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: ScopingServiceError) -> Response {
    let status = error_status(&error);
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
