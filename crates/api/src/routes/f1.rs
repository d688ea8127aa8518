//! Route definitions for the public `/f1` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::f1;
use crate::state::AppState;

/// Routes mounted at `/f1`.
///
/// ```text
/// GET    /schedule                  -> schedule
/// GET    /news?limit=               -> news
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/schedule", get(f1::schedule))
        .route("/news", get(f1::news))
}
