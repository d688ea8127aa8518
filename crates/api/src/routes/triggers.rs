//! Route definitions for the `/triggers` resource.
//!
//! All endpoints require the cron secret.

use axum::routing::post;
use axum::Router;

use crate::handlers::triggers;
use crate::state::AppState;

/// Routes mounted at `/triggers`.
///
/// ```text
/// POST   /{category}?run=&lead=     -> run_trigger
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{category}", post(triggers::run_trigger))
}
