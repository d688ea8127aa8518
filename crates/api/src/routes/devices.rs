//! Route definitions for the `/devices` resource.
//!
//! All endpoints require authentication.

use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::devices;
use crate::state::AppState;

/// Routes mounted at `/devices`.
///
/// ```text
/// POST   /                          -> register_device
/// POST   /cleanup                   -> cleanup_devices
/// DELETE /{token}                   -> unregister_device
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(devices::register_device))
        .route("/cleanup", post(devices::cleanup_devices))
        .route("/{token}", delete(devices::unregister_device))
}
