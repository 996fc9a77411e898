use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::scoping::router::ADMIN_USER_HEADER;

fn json_request(method: Method, uri: &str, admin: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(admin) = admin {
        builder = builder.header(ADMIN_USER_HEADER, admin);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn calculate_endpoint_returns_the_adjusted_quote() {
    let (service, _, _) = seeded_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages/pkg-platform-audit/scoping/calculate",
            None,
            json!({ "answers": { "team_size": 75 } }),
        ))
        .await
        .expect("calculate response");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["package_id"], "pkg-platform-audit");
    assert_eq!(payload["adjusted_timeline_weeks"], 10);
    let price: rust_decimal::Decimal = payload["adjusted_price"]
        .as_str()
        .expect("price serialized as a string")
        .parse()
        .expect("price parses");
    assert_eq!(price, rust_decimal::Decimal::from(25000));
    assert_eq!(payload["applied_rules"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn calculate_endpoint_maps_unknown_packages_to_404() {
    let (service, _, _) = seeded_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages/pkg-missing/scoping/calculate",
            None,
            json!({ "answers": {} }),
        ))
        .await
        .expect("calculate response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "package pkg-missing not found");
}

#[tokio::test]
async fn calculate_endpoint_rejects_invalid_answers() {
    let (service, _, _) = seeded_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages/pkg-platform-audit/scoping/calculate",
            None,
            json!({ "answers": { "team_size": "lots" } }),
        ))
        .await
        .expect("calculate response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn questionnaire_endpoint_lists_factors() {
    let (service, _, _) = seeded_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/packages/pkg-platform-audit/scoping/factors")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("questionnaire response");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let factors = payload.as_array().expect("factor list");
    assert_eq!(factors.len(), 1);
    assert_eq!(factors[0]["factor_key"], "team_size");
    assert_eq!(factors[0]["input_type"], "number");
}

#[tokio::test]
async fn admin_endpoints_require_the_admin_header() {
    let (service, _, audit) = build_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages/pkg-platform-audit/scoping/factors",
            None,
            serde_json::to_value(team_size_draft()).expect("draft serializes"),
        ))
        .await
        .expect("create response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(audit.entries().is_empty());
}

#[tokio::test]
async fn admin_can_author_factors_and_rules() {
    let (service, _, audit) = build_service();
    let app = router_with_service(service);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages/pkg-platform-audit/scoping/factors",
            Some(ADMIN),
            serde_json::to_value(team_size_draft()).expect("draft serializes"),
        ))
        .await
        .expect("factor response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages/pkg-platform-audit/scoping/rules",
            Some(ADMIN),
            json!({
                "rule_name": "Large team surcharge",
                "factor_key": "team_size",
                "operator": "greater_than",
                "condition_value": 50,
                "adjustment_type": "fixed_add",
                "adjustment_value": "5000",
                "timeline_adjustment_weeks": 2
            }),
        ))
        .await
        .expect("rule response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let rule = read_json_body(response).await;
    let rule_id = rule["rule_id"].as_str().expect("rule id").to_string();
    assert_eq!(rule["condition"]["operator"], "greater_than");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/scoping/rules/{rule_id}/active"),
            Some(ADMIN),
            json!({ "active": false }),
        ))
        .await
        .expect("activation response");
    assert_eq!(response.status(), StatusCode::OK);
    let rule = read_json_body(response).await;
    assert_eq!(rule["is_active"], false);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/v1/scoping/rules/{rule_id}"))
                .header(ADMIN_USER_HEADER, ADMIN)
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("delete response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(audit.entries().len(), 4);
}

#[tokio::test]
async fn duplicate_factor_keys_conflict() {
    let (service, _, _) = seeded_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages/pkg-platform-audit/scoping/factors",
            Some(ADMIN),
            serde_json::to_value(team_size_draft()).expect("draft serializes"),
        ))
        .await
        .expect("create response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_rule_drafts_are_unprocessable() {
    let (service, _, _) = seeded_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages/pkg-platform-audit/scoping/rules",
            Some(ADMIN),
            json!({
                "rule_name": "Mid-size",
                "factor_key": "team_size",
                "operator": "in_range",
                "condition_value": { "min": 40, "max": 10 }
            }),
        ))
        .await
        .expect("rule response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["error"],
        "in_range condition has min 40 above max 10"
    );
}

#[tokio::test]
async fn deleting_unknown_factors_is_not_found() {
    let (service, _, _) = build_service();
    let app = router_with_service(service);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/v1/scoping/factors/factor-missing")
                .header(ADMIN_USER_HEADER, ADMIN)
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("delete response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
