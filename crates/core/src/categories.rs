//! Well-known notification categories, subtypes and device platforms.
//!
//! The string forms must match the values stored in the
//! `notification_log.category` / `notification_type` columns and the
//! `{category}` path segment of the trigger endpoints.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A family of notifications sharing one preference toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Calendar,
    F1,
    Shopping,
    Bins,
    Chores,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 5] = [
        NotificationCategory::Calendar,
        NotificationCategory::F1,
        NotificationCategory::Shopping,
        NotificationCategory::Bins,
        NotificationCategory::Chores,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCategory::Calendar => "calendar",
            NotificationCategory::F1 => "f1",
            NotificationCategory::Shopping => "shopping",
            NotificationCategory::Bins => "bins",
            NotificationCategory::Chores => "chores",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Subtype
// ---------------------------------------------------------------------------

/// A finer-grained toggle inside a category.
///
/// Every subtype belongs to exactly one category; the category toggle and
/// the subtype toggle must both be on for a notification to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subtype {
    CalendarReminder15m,
    CalendarReminder30m,
    CalendarReminder1h,
    CalendarReminder1d,
    CalendarChanges,
    BinsEvening,
    BinsMorning,
    ChoreDue,
    ShoppingAdded,
    F1Session,
    F1News,
}

impl Subtype {
    pub fn category(self) -> NotificationCategory {
        match self {
            Subtype::CalendarReminder15m
            | Subtype::CalendarReminder30m
            | Subtype::CalendarReminder1h
            | Subtype::CalendarReminder1d
            | Subtype::CalendarChanges => NotificationCategory::Calendar,
            Subtype::BinsEvening | Subtype::BinsMorning => NotificationCategory::Bins,
            Subtype::ChoreDue => NotificationCategory::Chores,
            Subtype::ShoppingAdded => NotificationCategory::Shopping,
            Subtype::F1Session | Subtype::F1News => NotificationCategory::F1,
        }
    }

    /// Value written to `notification_log.notification_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Subtype::CalendarReminder15m => "calendar_reminder_15m",
            Subtype::CalendarReminder30m => "calendar_reminder_30m",
            Subtype::CalendarReminder1h => "calendar_reminder_1h",
            Subtype::CalendarReminder1d => "calendar_reminder_1d",
            Subtype::CalendarChanges => "calendar_changes",
            Subtype::BinsEvening => "bins_evening",
            Subtype::BinsMorning => "bins_morning",
            Subtype::ChoreDue => "chore_due",
            Subtype::ShoppingAdded => "shopping_added",
            Subtype::F1Session => "f1_session",
            Subtype::F1News => "f1_news",
        }
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Device platform a push token was registered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ios" => Some(Platform::Ios),
            "android" => Some(Platform::Android),
            "web" => Some(Platform::Web),
            _ => None,
        }
    }
}
