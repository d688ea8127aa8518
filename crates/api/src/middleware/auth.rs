//! Request extractors for the two kinds of caller: household members with
//! an access token, and the cron runner with the shared secret.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use hearth_core::error::CoreError;
use hearth_core::hashing::sha256_hex;
use hearth_core::types::OwnerId;

use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::state::AppState;

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}

/// The credential after `Bearer `.
fn bearer(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;
    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Expected a Bearer credential"))
}

/// The member a request acts for.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub owner_id: OwnerId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let owner_id = verify_token(bearer(parts)?, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;
        Ok(Self { owner_id })
    }
}

/// Caller presenting `Authorization: Bearer <CRON_SECRET>`.
///
/// Without a configured secret every request is refused with 503.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.cron_secret.as_deref() else {
            return Err(AppError::Core(CoreError::NotConfigured(
                "CRON_SECRET".into(),
            )));
        };

        // Compared as digests, never as raw strings.
        let presented = sha256_hex(bearer(parts)?.as_bytes());
        if presented != sha256_hex(secret.as_bytes()) {
            tracing::warn!("Trigger request with invalid cron secret");
            return Err(unauthorized("Invalid cron secret"));
        }
        Ok(Self)
    }
}
