//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, TestApp};

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = TestApp::offline();
    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["push_configured"], false);
    assert_eq!(json["ledger_degraded"], false);
}

// ---------------------------------------------------------------------------
// Test: failing ledger writes degrade the reported status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_ledger_writes_report_degraded() {
    let server = wiremock::MockServer::start().await;
    common::mount_gateway(&server, 1).await;
    let app = TestApp::with_push(&server);
    let owner = uuid::Uuid::new_v4();
    app.store.add_bin_collection(
        (common::noon() + chrono::Duration::days(1)).date_naive(),
        &["general"],
    );
    app.register_ios(owner, "device-a").await;
    app.store.fail_ledger_writes(true);

    let response = app
        .trigger("/api/v1/triggers/bins?run=evening", Some(common::CRON_SECRET))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(app.get("/health", None).await).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["ledger_degraded"], true);
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = TestApp::offline();
    let response = app.get("/this-route-does-not-exist", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = TestApp::offline();
    let response = app.get("/health", None).await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}
