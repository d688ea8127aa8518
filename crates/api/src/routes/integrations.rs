//! Route definitions for the `/integrations` resource.
//!
//! The callback authenticates through its `state` parameter; the rest
//! require a bearer token.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::integrations;
use crate::state::AppState;

/// Routes mounted at `/integrations`.
///
/// ```text
/// GET    /{provider}/callback       -> oauth_callback
/// POST   /{provider}/state          -> oauth_state
/// GET    /{provider}                -> integration_status
/// DELETE /{provider}                -> disconnect
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{provider}/callback", get(integrations::oauth_callback))
        .route("/{provider}/state", post(integrations::oauth_state))
        .route(
            "/{provider}",
            get(integrations::integration_status).delete(integrations::disconnect),
        )
}
