//! Handlers for the `/notifications` resource: inbox, preferences and the
//! calendar-change broadcast.
//!
//! All endpoints require authentication via [`AuthUser`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use hearth_core::error::CoreError;
use hearth_core::preferences::{NotificationPreferences, PreferencesUpdate};
use hearth_core::types::{DbId, Timestamp};
use hearth_db::models::notification_log::LedgerEntry;
use hearth_events::scheduler::{CalendarChange, ChangeKind};
use hearth_events::RunSummary;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Default page size for inbox listing.
const DEFAULT_LIMIT: i64 = 50;

/// Request body for `POST /notifications/calendar-change`.
#[derive(Debug, Deserialize, Validate)]
pub struct CalendarChangeRequest {
    pub event_id: DbId,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Start time after the change; absent for deletions.
    pub starts_at: Option<Timestamp>,
    /// `updated` or `deleted`.
    pub kind: ChangeKind,
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
///
/// The caller's delivered notifications, newest first.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<InboxQuery>,
) -> AppResult<Json<DataResponse<Vec<LedgerEntry>>>> {
    let entries = state
        .ledger
        .list_for_owner(
            auth.owner_id,
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.offset.unwrap_or(0),
        )
        .await?;

    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Returns 204 No Content, or 404 if the entry is not in the caller's inbox
/// or has already moved past `read`.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.ledger.mark_read(id, auth.owner_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: id.to_string(),
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/{id}/dismiss
pub async fn dismiss(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.ledger.dismiss(id, auth.owner_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: id.to_string(),
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/preferences
///
/// Members who never saved preferences get the defaults.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<NotificationPreferences>>> {
    let prefs = state
        .stores
        .preferences
        .preferences(auth.owner_id)
        .await?
        .unwrap_or_else(|| NotificationPreferences::defaults(auth.owner_id));

    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences
///
/// Partial update; omitted fields keep their current (or default) value.
pub async fn update_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PreferencesUpdate>,
) -> AppResult<Json<DataResponse<NotificationPreferences>>> {
    let current = state
        .stores
        .preferences
        .preferences(auth.owner_id)
        .await?
        .unwrap_or_else(|| NotificationPreferences::defaults(auth.owner_id));

    let saved = state
        .stores
        .preferences
        .save_preferences(&input.apply(current))
        .await?;

    tracing::info!(owner_id = %auth.owner_id, master_enabled = saved.master_enabled, "Preferences updated");
    Ok(Json(DataResponse { data: saved }))
}

// ---------------------------------------------------------------------------
// Calendar change broadcast
// ---------------------------------------------------------------------------

/// POST /api/v1/notifications/calendar-change
///
/// Tell the rest of the household that the caller updated or deleted a
/// shared event.
pub async fn calendar_change(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CalendarChangeRequest>,
) -> AppResult<Json<DataResponse<RunSummary>>> {
    input.validate()?;

    let change = CalendarChange {
        event_id: input.event_id,
        title: input.title,
        starts_at: input.starts_at,
        kind: input.kind,
        actor: auth.owner_id,
    };
    let summary = state.triggers.scheduler().run(&change).await?;

    tracing::info!(
        owner_id = %auth.owner_id,
        event_id = input.event_id,
        kind = %input.kind.as_str(),
        sent = summary.sent,
        "Calendar change broadcast"
    );
    Ok(Json(DataResponse { data: summary }))
}
