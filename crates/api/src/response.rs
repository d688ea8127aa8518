//! Shared response envelope types for API handlers.
//!
//! Member-facing responses use a `{ "data": ... }` envelope. Trigger
//! responses are the bare report so cron logs stay readable.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: prefs }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
