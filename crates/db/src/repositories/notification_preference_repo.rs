//! Repository for the `notification_preferences` table.

use hearth_core::preferences::NotificationPreferences;
use hearth_core::types::OwnerId;
use sqlx::PgPool;

use crate::models::preference::{NotificationPreferenceRow, PREFERENCE_COLUMNS};

pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// The stored preferences of a member, `None` when they never saved any.
    pub async fn get(
        pool: &PgPool,
        owner_id: OwnerId,
    ) -> Result<Option<NotificationPreferenceRow>, sqlx::Error> {
        let query =
            format!("SELECT {PREFERENCE_COLUMNS} FROM notification_preferences WHERE owner_id = $1");
        sqlx::query_as::<_, NotificationPreferenceRow>(&query)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace a member's preferences.
    pub async fn upsert(
        pool: &PgPool,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferenceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences (owner_id, master_enabled, calendar_enabled, \
                 f1_enabled, shopping_enabled, bins_enabled, chores_enabled, \
                 calendar_reminder_15m, calendar_reminder_30m, calendar_reminder_1h, \
                 calendar_reminder_1d, calendar_changes, bins_evening, bins_morning, \
                 f1_session_reminders, f1_news, notify_own_changes, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW()) \
             ON CONFLICT (owner_id) DO UPDATE SET \
                 master_enabled = EXCLUDED.master_enabled, \
                 calendar_enabled = EXCLUDED.calendar_enabled, \
                 f1_enabled = EXCLUDED.f1_enabled, \
                 shopping_enabled = EXCLUDED.shopping_enabled, \
                 bins_enabled = EXCLUDED.bins_enabled, \
                 chores_enabled = EXCLUDED.chores_enabled, \
                 calendar_reminder_15m = EXCLUDED.calendar_reminder_15m, \
                 calendar_reminder_30m = EXCLUDED.calendar_reminder_30m, \
                 calendar_reminder_1h = EXCLUDED.calendar_reminder_1h, \
                 calendar_reminder_1d = EXCLUDED.calendar_reminder_1d, \
                 calendar_changes = EXCLUDED.calendar_changes, \
                 bins_evening = EXCLUDED.bins_evening, \
                 bins_morning = EXCLUDED.bins_morning, \
                 f1_session_reminders = EXCLUDED.f1_session_reminders, \
                 f1_news = EXCLUDED.f1_news, \
                 notify_own_changes = EXCLUDED.notify_own_changes, \
                 updated_at = NOW() \
             RETURNING {PREFERENCE_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationPreferenceRow>(&query)
            .bind(prefs.owner_id)
            .bind(prefs.master_enabled)
            .bind(prefs.calendar_enabled)
            .bind(prefs.f1_enabled)
            .bind(prefs.shopping_enabled)
            .bind(prefs.bins_enabled)
            .bind(prefs.chores_enabled)
            .bind(prefs.calendar_reminder_15m)
            .bind(prefs.calendar_reminder_30m)
            .bind(prefs.calendar_reminder_1h)
            .bind(prefs.calendar_reminder_1d)
            .bind(prefs.calendar_changes)
            .bind(prefs.bins_evening)
            .bind(prefs.bins_morning)
            .bind(prefs.f1_session_reminders)
            .bind(prefs.f1_news)
            .bind(prefs.notify_own_changes)
            .fetch_one(pool)
            .await
    }
}
