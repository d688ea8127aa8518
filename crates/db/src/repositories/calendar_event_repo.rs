//! Repository for reminder queries over `calendar_events`.
//!
//! Marker updates are compare-and-set: a claim only succeeds while the
//! marker is still null, so two overlapping runs cannot both win.

use hearth_core::reminders::LeadTime;
use hearth_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::household::{lead_time_column, CalendarEvent, CALENDAR_EVENT_COLUMNS};

pub struct CalendarEventRepo;

impl CalendarEventRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CalendarEvent>, sqlx::Error> {
        let query = format!("SELECT {CALENDAR_EVENT_COLUMNS} FROM calendar_events WHERE id = $1");
        sqlx::query_as::<_, CalendarEvent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Timed events starting in `[start, end]` not yet reminded for `lead`.
    pub async fn due_for_reminder(
        pool: &PgPool,
        lead: LeadTime,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<CalendarEvent>, sqlx::Error> {
        let marker = lead_time_column(lead);
        let query = format!(
            "SELECT {CALENDAR_EVENT_COLUMNS} FROM calendar_events \
             WHERE starts_at >= $1 AND starts_at <= $2 \
               AND {marker} IS NULL AND NOT all_day \
             ORDER BY starts_at"
        );
        sqlx::query_as::<_, CalendarEvent>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    /// Set the marker for `lead` if still null. Returns `true` when claimed.
    pub async fn claim_reminder(
        pool: &PgPool,
        id: DbId,
        lead: LeadTime,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let marker = lead_time_column(lead);
        let query = format!(
            "UPDATE calendar_events SET {marker} = $2 WHERE id = $1 AND {marker} IS NULL"
        );
        let result = sqlx::query(&query).bind(id).bind(at).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Undo a claim made at `at` (and only that claim).
    pub async fn release_reminder(
        pool: &PgPool,
        id: DbId,
        lead: LeadTime,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let marker = lead_time_column(lead);
        let query =
            format!("UPDATE calendar_events SET {marker} = NULL WHERE id = $1 AND {marker} = $2");
        let result = sqlx::query(&query).bind(id).bind(at).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
