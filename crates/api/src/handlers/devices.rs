//! Handlers for the `/devices` resource.
//!
//! All endpoints require authentication via [`AuthUser`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hearth_core::categories::Platform;
use hearth_core::error::CoreError;
use hearth_core::hashing::fingerprint;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /devices`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDevice {
    #[validate(length(min = 1, max = 512))]
    pub token: String,
    /// `ios`, `android` or `web`.
    pub platform: String,
}

#[derive(Debug, Serialize)]
pub struct CleanupResult {
    pub removed: u64,
}

/// POST /api/v1/devices
///
/// Register a push token for the caller. Re-registering an existing token
/// refreshes its registration time.
pub async fn register_device(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RegisterDevice>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let platform = Platform::parse(&input.platform).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unknown platform '{}'",
            input.platform
        )))
    })?;

    let device = state
        .stores
        .devices
        .upsert_device(auth.owner_id, input.token.trim(), platform, state.clock.now())
        .await?;

    tracing::info!(
        owner_id = %auth.owner_id,
        platform = %platform.as_str(),
        token = %fingerprint(&device.token),
        "Device registered"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: device })))
}

/// DELETE /api/v1/devices/{token}
///
/// Returns 204 No Content, or 404 if the caller has no such token.
pub async fn unregister_device(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<StatusCode> {
    let removed = state
        .stores
        .devices
        .remove_device(auth.owner_id, &token)
        .await?;

    if !removed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Device token",
            id: fingerprint(&token),
        }));
    }

    tracing::info!(owner_id = %auth.owner_id, token = %fingerprint(&token), "Device unregistered");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/devices/cleanup
///
/// Keep only the caller's most recently registered token.
pub async fn cleanup_devices(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<CleanupResult>>> {
    let removed = state
        .stores
        .devices
        .retain_newest_device(auth.owner_id)
        .await?;

    tracing::info!(owner_id = %auth.owner_id, removed, "Stale devices removed");
    Ok(Json(DataResponse {
        data: CleanupResult { removed },
    }))
}
