//! Handlers for the `/integrations` resource (calendar provider OAuth).
//!
//! The callback is reached by the browser after consent, so it answers with
//! a redirect back to the app instead of JSON. The `state` parameter is a
//! short-lived token from `POST /integrations/{provider}/state`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use hearth_core::error::CoreError;
use hearth_core::providers::OAuthProvider;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{issue_oauth_state, verify_oauth_state, OAUTH_STATE_TTL_SECS};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the member declined consent.
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OAuthState {
    pub state: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct IntegrationStatus {
    pub provider: OAuthProvider,
    pub connected: bool,
}

fn parse_provider(value: &str) -> AppResult<OAuthProvider> {
    OAuthProvider::parse(value).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Integration provider",
            id: value.to_string(),
        })
    })
}

/// Append `key=value` to the app's return URL.
fn return_to(base: &str, key: &str, value: &str) -> Redirect {
    let separator = if base.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{base}{separator}{key}={value}"))
}

/// GET /api/v1/integrations/{provider}/callback
///
/// Exchange the authorization code and redirect with `?connected=<provider>`
/// on success or `?error=<code>` on failure.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackQuery>,
) -> AppResult<Redirect> {
    let provider = parse_provider(&provider)?;
    let app_url = state.config.app_return_url.as_str();

    if let Some(reason) = params.error.as_deref() {
        tracing::info!(provider = %provider, reason, "OAuth consent declined");
        return Ok(return_to(app_url, "error", "access_denied"));
    }

    let Some(owner_id) = params
        .state
        .as_deref()
        .and_then(|token| verify_oauth_state(token, provider.as_str(), &state.config.jwt).ok())
    else {
        tracing::warn!(provider = %provider, "OAuth callback with invalid state");
        return Ok(return_to(app_url, "error", "invalid_state"));
    };

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return Ok(return_to(app_url, "error", "missing_code"));
    };

    let redirect_uri = state.config.oauth_redirect_uri(provider.as_str());
    match state
        .vault
        .connect(owner_id, provider, code, &redirect_uri)
        .await
    {
        Ok(()) => Ok(return_to(app_url, "connected", provider.as_str())),
        Err(e) => {
            tracing::warn!(owner_id = %owner_id, provider = %provider, error = %e, "OAuth connect failed");
            Ok(return_to(app_url, "error", e.code()))
        }
    }
}

/// POST /api/v1/integrations/{provider}/state
///
/// Mint the `state` value the app puts on the provider's consent URL.
pub async fn oauth_state(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> AppResult<Json<DataResponse<OAuthState>>> {
    let provider = parse_provider(&provider)?;
    let token = issue_oauth_state(auth.owner_id, provider.as_str(), &state.config.jwt)
        .map_err(|e| AppError::Core(CoreError::Internal(format!("Failed to sign OAuth state: {e}"))))?;

    Ok(Json(DataResponse {
        data: OAuthState {
            state: token,
            expires_in: OAUTH_STATE_TTL_SECS,
        },
    }))
}

/// GET /api/v1/integrations/{provider}
pub async fn integration_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> AppResult<Json<DataResponse<IntegrationStatus>>> {
    let provider = parse_provider(&provider)?;
    let connected = state.vault.is_connected(auth.owner_id, provider).await?;

    Ok(Json(DataResponse {
        data: IntegrationStatus {
            provider,
            connected,
        },
    }))
}

/// DELETE /api/v1/integrations/{provider}
///
/// Returns 204 No Content, or 404 if the provider was not connected.
pub async fn disconnect(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> AppResult<StatusCode> {
    let provider = parse_provider(&provider)?;

    if !state.vault.disconnect(auth.owner_id, provider).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Integration",
            id: provider.as_str().to_string(),
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}
