//! Integration tests for `/api/v1/devices`.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{body_json, TestApp};
use hearth_db::stores::DeviceTokenStore;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn register_device_returns_201() {
    let app = TestApp::offline();
    let owner = Uuid::new_v4();

    let response = app
        .request(
            Method::POST,
            "/api/v1/devices",
            Some(owner),
            Some(json!({ "token": "abc123", "platform": "iOS" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["token"], "abc123");
    assert_eq!(json["data"]["platform"], "ios");
    assert_eq!(json["data"]["owner_id"], owner.to_string());
}

#[tokio::test]
async fn registering_twice_keeps_one_row() {
    let app = TestApp::offline();
    let owner = Uuid::new_v4();
    let body = json!({ "token": "abc123", "platform": "ios" });

    for _ in 0..2 {
        let response = app
            .request(Method::POST, "/api/v1/devices", Some(owner), Some(body.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    assert_eq!(app.store.devices_for_owner(owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_platform_is_rejected() {
    let app = TestApp::offline();

    let response = app
        .request(
            Method::POST,
            "/api/v1/devices",
            Some(Uuid::new_v4()),
            Some(json!({ "token": "abc123", "platform": "pager" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn empty_token_is_rejected() {
    let app = TestApp::offline();

    let response = app
        .request(
            Method::POST,
            "/api/v1/devices",
            Some(Uuid::new_v4()),
            Some(json!({ "token": "", "platform": "ios" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn register_requires_a_token() {
    let app = TestApp::offline();

    let response = app
        .request(
            Method::POST,
            "/api/v1/devices",
            None,
            Some(json!({ "token": "abc123", "platform": "ios" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unregister_returns_204_then_404() {
    let app = TestApp::offline();
    let owner = Uuid::new_v4();
    app.register_ios(owner, "abc123").await;

    let response = app
        .request(Method::DELETE, "/api/v1/devices/abc123", Some(owner), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::DELETE, "/api/v1/devices/abc123", Some(owner), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cannot_unregister_another_members_device() {
    let app = TestApp::offline();
    let owner = Uuid::new_v4();
    app.register_ios(owner, "abc123").await;

    let response = app
        .request(
            Method::DELETE,
            "/api/v1/devices/abc123",
            Some(Uuid::new_v4()),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.devices_for_owner(owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cleanup_keeps_the_newest_registration() {
    let app = TestApp::offline();
    let owner = Uuid::new_v4();
    app.register_ios(owner, "old-phone").await;
    app.clock.advance(Duration::minutes(5));
    app.register_ios(owner, "new-phone").await;

    let response = app
        .request(Method::POST, "/api/v1/devices/cleanup", Some(owner), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["removed"], 1);

    let remaining = app.store.devices_for_owner(owner).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].token, "new-phone");
}
