//! Handlers for the public `/f1` resource.
//!
//! Both endpoints serve from the fetch cache and say whether the payload is
//! stale (a refresh failed and an older copy was returned).

use axum::extract::{Query, State};
use axum::Json;
use hearth_core::types::Timestamp;
use hearth_events::sources::{Article, Race};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Default number of articles returned by `GET /f1/news`.
const DEFAULT_NEWS_LIMIT: usize = 20;

/// Maximum number of articles returned by `GET /f1/news`.
const MAX_NEWS_LIMIT: usize = 50;

/// `{ "data": T, "stale": bool }` envelope for cached payloads.
#[derive(Debug, Serialize)]
pub struct CachedResponse<T: Serialize> {
    pub data: T,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/f1/schedule
///
/// 502 only when the source is down and nothing was ever cached.
pub async fn schedule(
    State(state): State<AppState>,
) -> AppResult<Json<CachedResponse<Vec<Race>>>> {
    let cached = state
        .schedule
        .schedule()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(CachedResponse {
        data: cached.value,
        stale: cached.stale,
        fetched_at: Some(cached.fetched_at),
    }))
}

/// GET /api/v1/f1/news
///
/// Feeds that cannot be fetched are left out; with none available the list
/// is empty.
pub async fn news(
    State(state): State<AppState>,
    Query(params): Query<NewsQuery>,
) -> Json<CachedResponse<Vec<Article>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_NEWS_LIMIT)
        .clamp(1, MAX_NEWS_LIMIT);
    let digest = state.news.latest(limit).await;

    Json(CachedResponse {
        data: digest.articles,
        stale: digest.stale,
        fetched_at: None,
    })
}
