use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `ok`, or `degraded` when the database is unreachable or ledger
    /// writes are failing.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub push_configured: bool,
    pub ledger_degraded: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    // The in-memory store has no connection to lose.
    let db_healthy = match state.pool.as_ref() {
        Some(pool) => hearth_db::health_check(pool).await.is_ok(),
        None => true,
    };
    let ledger_degraded = state.ledger.is_degraded();

    Json(HealthReport {
        status: if db_healthy && !ledger_degraded {
            "ok"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        push_configured: state.dispatcher.is_configured(),
        ledger_degraded,
    })
}

/// `GET /health`, mounted at the root rather than under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
