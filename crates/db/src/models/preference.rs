//! Notification preference row.

use hearth_core::preferences::NotificationPreferences;
use hearth_core::types::{OwnerId, Timestamp};
use sqlx::FromRow;

/// Column list for `notification_preferences` queries.
pub const PREFERENCE_COLUMNS: &str = "owner_id, master_enabled, calendar_enabled, f1_enabled, \
     shopping_enabled, bins_enabled, chores_enabled, calendar_reminder_15m, \
     calendar_reminder_30m, calendar_reminder_1h, calendar_reminder_1d, calendar_changes, \
     bins_evening, bins_morning, f1_session_reminders, f1_news, notify_own_changes, updated_at";

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationPreferenceRow {
    pub owner_id: OwnerId,
    pub master_enabled: bool,
    pub calendar_enabled: bool,
    pub f1_enabled: bool,
    pub shopping_enabled: bool,
    pub bins_enabled: bool,
    pub chores_enabled: bool,
    pub calendar_reminder_15m: bool,
    pub calendar_reminder_30m: bool,
    pub calendar_reminder_1h: bool,
    pub calendar_reminder_1d: bool,
    pub calendar_changes: bool,
    pub bins_evening: bool,
    pub bins_morning: bool,
    pub f1_session_reminders: bool,
    pub f1_news: bool,
    pub notify_own_changes: bool,
    pub updated_at: Timestamp,
}

impl From<NotificationPreferenceRow> for NotificationPreferences {
    fn from(row: NotificationPreferenceRow) -> Self {
        Self {
            owner_id: row.owner_id,
            master_enabled: row.master_enabled,
            calendar_enabled: row.calendar_enabled,
            f1_enabled: row.f1_enabled,
            shopping_enabled: row.shopping_enabled,
            bins_enabled: row.bins_enabled,
            chores_enabled: row.chores_enabled,
            calendar_reminder_15m: row.calendar_reminder_15m,
            calendar_reminder_30m: row.calendar_reminder_30m,
            calendar_reminder_1h: row.calendar_reminder_1h,
            calendar_reminder_1d: row.calendar_reminder_1d,
            calendar_changes: row.calendar_changes,
            bins_evening: row.bins_evening,
            bins_morning: row.bins_morning,
            f1_session_reminders: row.f1_session_reminders,
            f1_news: row.f1_news,
            notify_own_changes: row.notify_own_changes,
        }
    }
}
