//! JSON API over an in-memory store.

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use discount_sync_admin::routes;
use discount_sync_integration_tests::{MemoryStore, app_state};

fn app() -> (std::sync::Arc<MemoryStore>, Router) {
    let (store, state) = app_state();
    (store, routes::routes().with_state(state))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn condition(id: &str, kind: &str, operator: &str, value: &str) -> Value {
    json!({ "id": id, "type": kind, "operator": operator, "value": value })
}

fn tiered_conditions() -> Value {
    json!([
        condition("c1", "cartTotal", "greaterThanOrEqual", "100"),
        condition("c2", "country", "equals", "PL,DE"),
        condition("c3", "customerLoggedIn", "isNotLoggedIn", ""),
    ])
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (_store, app) = app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Evaluate
// ============================================================================

#[tokio::test]
async fn test_evaluate_eligible_cart() {
    let (_store, app) = app();
    let body = json!({
        "conditions": tiered_conditions(),
        "context": { "cartTotal": 120.0, "country": "PL", "loggedIn": false },
    });

    let (status, value) = send(app, "POST", "/api/evaluate", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["eligible"], json!(true));
}

#[tokio::test]
async fn test_evaluate_ineligible_cart() {
    let (_store, app) = app();
    let body = json!({
        "conditions": tiered_conditions(),
        "context": { "cartTotal": 120.0, "country": "FR", "loggedIn": false },
    });

    let (status, value) = send(app, "POST", "/api/evaluate", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["eligible"], json!(false));
}

#[tokio::test]
async fn test_evaluate_misconfigured_condition_is_422() {
    let (_store, app) = app();
    let body = json!({
        "conditions": [condition("bad", "country", "lessThan", "DE")],
        "context": { "country": "DE" },
    });

    let (status, value) = send(app, "POST", "/api/evaluate", Some(body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(value["error"].as_str().expect("message").contains("bad"));
}

// ============================================================================
// Records and sync
// ============================================================================

#[tokio::test]
async fn test_publish_list_and_remove() {
    let (store, app) = app();
    let record = json!({
        "id": "rec-1",
        "name": "Spring",
        "valueKind": "percentage",
        "value": 10.0,
        "createdAt": "2026-03-01T00:00:00Z",
    });

    let (status, created) = send(app.clone(), "POST", "/api/records", Some(record)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["remoteRef"].is_string());
    assert_eq!(store.objects().len(), 1);

    let (status, listed) = send(app.clone(), "GET", "/api/records", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, _) = send(app.clone(), "DELETE", "/api/records/rec-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(store.objects().is_empty());

    let (status, _) = send(app, "DELETE", "/api/records/rec-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_active_route() {
    let (_store, app) = app();
    let record = json!({
        "id": "rec-2",
        "name": "Summer",
        "valueKind": "fixedAmount",
        "value": 5.0,
        "createdAt": "2026-06-01T00:00:00Z",
    });
    send(app.clone(), "POST", "/api/records", Some(record)).await;

    let (status, updated) = send(
        app,
        "POST",
        "/api/records/rec-2/active",
        Some(json!({ "active": false })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["active"], json!(false));
}

#[tokio::test]
async fn test_sync_reports_orphans() {
    let (store, app) = app();
    store.insert_app_object("gid://shopify/DiscountAutomaticNode/42", "Leftover");

    let (status, report) = send(app, "POST", "/api/sync", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["deletedOrphanCount"], json!(1));
    assert!(store.objects().is_empty());
}

#[tokio::test]
async fn test_overlapping_sync_is_409() {
    let (store, app) = app();
    let record = json!({
        "id": "rec-3",
        "name": "Slow",
        "valueKind": "percentage",
        "value": 10.0,
        "createdAt": "2026-06-01T00:00:00Z",
    });
    send(app.clone(), "POST", "/api/records", Some(record)).await;
    store.delay_lookups(Duration::from_millis(50));

    let (first, second) = tokio::join!(send(app.clone(), "POST", "/api/sync", None), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        send(app.clone(), "POST", "/api/sync", None).await
    });

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_panel_round_trip() {
    let (store, app) = app();

    let (status, outcome) = send(
        app.clone(),
        "PUT",
        "/api/panel",
        Some(json!({ "title": "Offers", "accent": "#ff6600" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["fieldsWritten"], json!(2));
    assert_eq!(store.document("panel", "accent").as_deref(), Some("#ff6600"));

    let (status, panel) = send(app, "GET", "/api/panel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(panel["title"], json!("Offers"));
}

#[tokio::test]
async fn test_migrate_route() {
    let (store, app) = app();
    store.insert_document("discounts", "record0_id", "legacy-1");
    store.insert_document("discounts", "record0_name", "Legacy");
    store.insert_document("discounts", "record0_threshold", "50");
    store.insert_document("discounts", "record0_value", "5");

    let (status, body) = send(app.clone(), "POST", "/api/migrate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["migrated"], json!(true));

    let (_, body) = send(app, "POST", "/api/migrate", None).await;
    assert_eq!(body["migrated"], json!(false));
}
