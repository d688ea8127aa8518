//! Integration tests for `/api/v1/integrations`: OAuth callback redirects,
//! status and disconnect.

mod common;

use axum::http::header::LOCATION;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use common::{body_json, TestApp, APP_RETURN_URL};
use hearth_api::auth::jwt::{issue_oauth_state, issue_token, verify_oauth_state};
use hearth_api::state::EngineSettings;
use hearth_core::crypto::TokenCipher;
use hearth_core::providers::OAuthProvider;
use hearth_core::types::OwnerId;
use hearth_events::vault::{HttpTokenEndpoint, OAuthProviderConfig};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// App with a cipher and a Google token endpoint served by `server`.
fn connected_app(server: &MockServer) -> TestApp {
    let endpoint = HttpTokenEndpoint::new(vec![OAuthProviderConfig {
        provider: OAuthProvider::Google,
        client_id: "client-id".into(),
        client_secret: "client-secret".into(),
        token_url: format!("{}/token", server.uri()),
    }])
    .unwrap();

    TestApp::new(EngineSettings {
        cipher: Some(TokenCipher::new([7; 32])),
        oauth: endpoint,
        ..common::offline_settings()
    })
}

fn state_token(app: &TestApp, owner_id: OwnerId) -> String {
    issue_oauth_state(owner_id, "google", &app.state.config.jwt).unwrap()
}

fn location(response: &Response) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn declined_consent_redirects_with_access_denied() {
    let app = TestApp::offline();

    let response = app
        .get(
            "/api/v1/integrations/google/callback?error=access_denied&state=x",
            None,
        )
        .await;

    assert_eq!(
        location(&response),
        format!("{APP_RETURN_URL}?error=access_denied")
    );
}

#[tokio::test]
async fn invalid_state_redirects_with_error() {
    let app = TestApp::offline();

    let response = app
        .get(
            "/api/v1/integrations/google/callback?code=abc&state=not-a-jwt",
            None,
        )
        .await;

    assert_eq!(
        location(&response),
        format!("{APP_RETURN_URL}?error=invalid_state")
    );
}

#[tokio::test]
async fn access_token_is_not_accepted_as_state() {
    let app = TestApp::offline();
    let access = issue_token(Uuid::new_v4(), &app.state.config.jwt).unwrap();

    let response = app
        .get(
            &format!("/api/v1/integrations/google/callback?code=abc&state={access}"),
            None,
        )
        .await;

    assert_eq!(
        location(&response),
        format!("{APP_RETURN_URL}?error=invalid_state")
    );
}

#[tokio::test]
async fn state_for_another_provider_is_rejected() {
    let app = TestApp::offline();
    let state = issue_oauth_state(Uuid::new_v4(), "microsoft", &app.state.config.jwt).unwrap();

    let response = app
        .get(
            &format!("/api/v1/integrations/google/callback?code=abc&state={state}"),
            None,
        )
        .await;

    assert_eq!(
        location(&response),
        format!("{APP_RETURN_URL}?error=invalid_state")
    );
}

#[tokio::test]
async fn state_endpoint_mints_a_provider_bound_token() {
    let app = TestApp::offline();
    let owner = Uuid::new_v4();

    let response = app
        .request(
            Method::POST,
            "/api/v1/integrations/google/state",
            Some(owner),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["expires_in"], 600);
    let state = json["data"]["state"].as_str().unwrap();
    assert_eq!(
        verify_oauth_state(state, "google", &app.state.config.jwt).unwrap(),
        owner
    );
}

#[tokio::test]
async fn state_endpoint_requires_authentication() {
    let app = TestApp::offline();

    let response = app
        .request(Method::POST, "/api/v1/integrations/google/state", None, None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_code_redirects_with_error() {
    let app = TestApp::offline();
    let state = state_token(&app, Uuid::new_v4());

    let response = app
        .get(
            &format!("/api/v1/integrations/google/callback?state={state}"),
            None,
        )
        .await;

    assert_eq!(
        location(&response),
        format!("{APP_RETURN_URL}?error=missing_code")
    );
}

#[tokio::test]
async fn callback_without_encryption_key_reports_not_configured() {
    let app = TestApp::offline();
    let state = state_token(&app, Uuid::new_v4());

    let response = app
        .get(
            &format!("/api/v1/integrations/google/callback?code=abc&state={state}"),
            None,
        )
        .await;

    assert_eq!(
        location(&response),
        format!("{APP_RETURN_URL}?error=not_configured")
    );
}

#[tokio::test]
async fn failed_exchange_redirects_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;
    let app = connected_app(&server);
    let state = state_token(&app, Uuid::new_v4());

    let response = app
        .get(
            &format!("/api/v1/integrations/google/callback?code=stale&state={state}"),
            None,
        )
        .await;

    assert_eq!(
        location(&response),
        format!("{APP_RETURN_URL}?error=token_exchange_failed")
    );
}

#[tokio::test]
async fn successful_connect_then_disconnect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=consent-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = connected_app(&server);
    let owner = Uuid::new_v4();
    let state = state_token(&app, owner);

    let response = app
        .get(
            &format!("/api/v1/integrations/google/callback?code=consent-code&state={state}"),
            None,
        )
        .await;
    assert_eq!(
        location(&response),
        format!("{APP_RETURN_URL}?connected=google")
    );

    let status = body_json(app.get("/api/v1/integrations/google", Some(owner)).await).await;
    assert_eq!(status["data"]["provider"], "google");
    assert_eq!(status["data"]["connected"], true);

    let token = app
        .state
        .vault
        .get_valid_access_token(owner, OAuthProvider::Google)
        .await;
    assert_eq!(token.as_deref(), Some("access-1"));

    let removed = app
        .request(
            Method::DELETE,
            "/api/v1/integrations/google",
            Some(owner),
            None,
        )
        .await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let again = app
        .request(
            Method::DELETE,
            "/api/v1/integrations/google",
            Some(owner),
            None,
        )
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_is_false_before_connecting() {
    let app = TestApp::offline();

    let response = app
        .get("/api/v1/integrations/microsoft", Some(Uuid::new_v4()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["provider"], "microsoft");
    assert_eq!(json["data"]["connected"], false);
}

#[tokio::test]
async fn unknown_provider_is_404() {
    let app = TestApp::offline();

    let response = app
        .get("/api/v1/integrations/myspace", Some(Uuid::new_v4()))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_requires_authentication() {
    let app = TestApp::offline();

    let response = app.get("/api/v1/integrations/google", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
