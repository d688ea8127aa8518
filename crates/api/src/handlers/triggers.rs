//! Handlers for the cron-driven `/triggers` resource.

use axum::extract::{Path, Query, State};
use axum::Json;
use hearth_core::categories::NotificationCategory;
use hearth_core::error::CoreError;
use hearth_events::TriggerReport;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CronAuth;
use crate::state::AppState;

/// Query parameters for `POST /triggers/{category}`.
#[derive(Debug, Deserialize)]
pub struct TriggerQuery {
    /// Run type (`evening`, `morning`, `sessions`, `news`, ...).
    pub run: Option<String>,
    /// Calendar lead time; same as `run` for the calendar category.
    pub lead: Option<String>,
}

/// POST /api/v1/triggers/{category}
///
/// Run one category's reminders now and report what happened. The body is
/// the bare [`TriggerReport`], not wrapped in a data envelope.
pub async fn run_trigger(
    _cron: CronAuth,
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<TriggerQuery>,
) -> AppResult<Json<TriggerReport>> {
    let category = NotificationCategory::parse(&category).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Trigger category",
            id: category.clone(),
        })
    })?;
    let run_type = params.run.as_deref().or(params.lead.as_deref());

    let report = state.triggers.run(category, run_type).await?;

    tracing::info!(
        category = %category,
        run_type = %report.run_type,
        count = report.count,
        sent = report.sent,
        skipped = report.skipped,
        "Trigger completed"
    );
    Ok(Json(report))
}
