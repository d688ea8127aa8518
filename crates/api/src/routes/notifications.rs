//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                          -> list_notifications
/// POST   /{id}/read                 -> mark_read
/// POST   /{id}/dismiss              -> dismiss
///
/// GET    /preferences               -> get_preferences
/// PUT    /preferences               -> update_preferences
///
/// POST   /calendar-change           -> calendar_change
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // Inbox
        .route("/", get(notifications::list_notifications))
        .route("/{id}/read", post(notifications::mark_read))
        .route("/{id}/dismiss", post(notifications::dismiss))
        // Preferences
        .route(
            "/preferences",
            get(notifications::get_preferences).put(notifications::update_preferences),
        )
        // Broadcasts
        .route("/calendar-change", post(notifications::calendar_change))
}
