pub mod devices;
pub mod f1;
pub mod health;
pub mod integrations;
pub mod notifications;
pub mod triggers;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /triggers/{category}                             run a category now (cron secret)
///
/// /devices                                         register (POST)
/// /devices/cleanup                                 keep newest token (POST)
/// /devices/{token}                                 unregister (DELETE)
///
/// /notifications                                   inbox (GET)
/// /notifications/{id}/read                         mark read (POST)
/// /notifications/{id}/dismiss                      dismiss (POST)
/// /notifications/preferences                       get, update (GET, PUT)
/// /notifications/calendar-change                   broadcast a change (POST)
///
/// /integrations/{provider}/callback                OAuth redirect target (GET)
/// /integrations/{provider}/state                   OAuth state token (POST)
/// /integrations/{provider}                         status, disconnect (GET, DELETE)
///
/// /f1/schedule                                     cached season schedule (public)
/// /f1/news                                         cached headlines (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/triggers", triggers::router())
        .nest("/devices", devices::router())
        .nest("/notifications", notifications::router())
        .nest("/integrations", integrations::router())
        .nest("/f1", f1::router())
}
