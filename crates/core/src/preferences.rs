//! Typed notification preferences and the per-subtype default table.
//!
//! A member with no stored preference row gets [`NotificationPreferences::defaults`],
//! which is category-specific rather than "everything on".

use serde::{Deserialize, Serialize};

use crate::categories::{NotificationCategory, Subtype};
use crate::types::OwnerId;

// ---------------------------------------------------------------------------
// Default table
// ---------------------------------------------------------------------------

pub const DEFAULT_MASTER_ENABLED: bool = true;
pub const DEFAULT_NOTIFY_OWN_CHANGES: bool = false;

/// Category toggle defaults.
pub fn default_category_enabled(category: NotificationCategory) -> bool {
    match category {
        NotificationCategory::Calendar => true,
        NotificationCategory::Bins => true,
        NotificationCategory::Chores => true,
        NotificationCategory::Shopping => true,
        // Opt-in: not every household follows the races.
        NotificationCategory::F1 => false,
    }
}

/// Subtype toggle defaults.
pub fn default_subtype_enabled(subtype: Subtype) -> bool {
    match subtype {
        Subtype::CalendarReminder15m => true,
        Subtype::CalendarReminder30m => false,
        Subtype::CalendarReminder1h => true,
        Subtype::CalendarReminder1d => false,
        Subtype::CalendarChanges => true,
        Subtype::BinsEvening => true,
        Subtype::BinsMorning => false,
        Subtype::ChoreDue => true,
        Subtype::ShoppingAdded => true,
        Subtype::F1Session => true,
        Subtype::F1News => false,
    }
}

// ---------------------------------------------------------------------------
// NotificationPreferences
// ---------------------------------------------------------------------------

/// One member's notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
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

    /// Receive broadcasts about changes this member made themselves.
    pub notify_own_changes: bool,
}

impl NotificationPreferences {
    /// Preferences applied when a member has never saved any.
    pub fn defaults(owner_id: OwnerId) -> Self {
        use NotificationCategory as C;
        Self {
            owner_id,
            master_enabled: DEFAULT_MASTER_ENABLED,
            calendar_enabled: default_category_enabled(C::Calendar),
            f1_enabled: default_category_enabled(C::F1),
            shopping_enabled: default_category_enabled(C::Shopping),
            bins_enabled: default_category_enabled(C::Bins),
            chores_enabled: default_category_enabled(C::Chores),
            calendar_reminder_15m: default_subtype_enabled(Subtype::CalendarReminder15m),
            calendar_reminder_30m: default_subtype_enabled(Subtype::CalendarReminder30m),
            calendar_reminder_1h: default_subtype_enabled(Subtype::CalendarReminder1h),
            calendar_reminder_1d: default_subtype_enabled(Subtype::CalendarReminder1d),
            calendar_changes: default_subtype_enabled(Subtype::CalendarChanges),
            bins_evening: default_subtype_enabled(Subtype::BinsEvening),
            bins_morning: default_subtype_enabled(Subtype::BinsMorning),
            f1_session_reminders: default_subtype_enabled(Subtype::F1Session),
            f1_news: default_subtype_enabled(Subtype::F1News),
            notify_own_changes: DEFAULT_NOTIFY_OWN_CHANGES,
        }
    }

    pub fn category_enabled(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Calendar => self.calendar_enabled,
            NotificationCategory::F1 => self.f1_enabled,
            NotificationCategory::Shopping => self.shopping_enabled,
            NotificationCategory::Bins => self.bins_enabled,
            NotificationCategory::Chores => self.chores_enabled,
        }
    }

    pub fn subtype_enabled(&self, subtype: Subtype) -> bool {
        match subtype {
            Subtype::CalendarReminder15m => self.calendar_reminder_15m,
            Subtype::CalendarReminder30m => self.calendar_reminder_30m,
            Subtype::CalendarReminder1h => self.calendar_reminder_1h,
            Subtype::CalendarReminder1d => self.calendar_reminder_1d,
            Subtype::CalendarChanges => self.calendar_changes,
            Subtype::BinsEvening => self.bins_evening,
            Subtype::BinsMorning => self.bins_morning,
            // Chores and shopping have a single toggle: the category itself.
            Subtype::ChoreDue | Subtype::ShoppingAdded => true,
            Subtype::F1Session => self.f1_session_reminders,
            Subtype::F1News => self.f1_news,
        }
    }

    /// Master, category and subtype toggles must all be on.
    pub fn allows(&self, subtype: Subtype) -> bool {
        self.master_enabled
            && self.category_enabled(subtype.category())
            && self.subtype_enabled(subtype)
    }
}

// ---------------------------------------------------------------------------
// PreferencesUpdate
// ---------------------------------------------------------------------------

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreferencesUpdate {
    pub master_enabled: Option<bool>,
    pub calendar_enabled: Option<bool>,
    pub f1_enabled: Option<bool>,
    pub shopping_enabled: Option<bool>,
    pub bins_enabled: Option<bool>,
    pub chores_enabled: Option<bool>,
    pub calendar_reminder_15m: Option<bool>,
    pub calendar_reminder_30m: Option<bool>,
    pub calendar_reminder_1h: Option<bool>,
    pub calendar_reminder_1d: Option<bool>,
    pub calendar_changes: Option<bool>,
    pub bins_evening: Option<bool>,
    pub bins_morning: Option<bool>,
    pub f1_session_reminders: Option<bool>,
    pub f1_news: Option<bool>,
    pub notify_own_changes: Option<bool>,
}

impl PreferencesUpdate {
    pub fn apply(&self, mut prefs: NotificationPreferences) -> NotificationPreferences {
        let fields: [(&mut bool, Option<bool>); 16] = [
            (&mut prefs.master_enabled, self.master_enabled),
            (&mut prefs.calendar_enabled, self.calendar_enabled),
            (&mut prefs.f1_enabled, self.f1_enabled),
            (&mut prefs.shopping_enabled, self.shopping_enabled),
            (&mut prefs.bins_enabled, self.bins_enabled),
            (&mut prefs.chores_enabled, self.chores_enabled),
            (&mut prefs.calendar_reminder_15m, self.calendar_reminder_15m),
            (&mut prefs.calendar_reminder_30m, self.calendar_reminder_30m),
            (&mut prefs.calendar_reminder_1h, self.calendar_reminder_1h),
            (&mut prefs.calendar_reminder_1d, self.calendar_reminder_1d),
            (&mut prefs.calendar_changes, self.calendar_changes),
            (&mut prefs.bins_evening, self.bins_evening),
            (&mut prefs.bins_morning, self.bins_morning),
            (&mut prefs.f1_session_reminders, self.f1_session_reminders),
            (&mut prefs.f1_news, self.f1_news),
            (&mut prefs.notify_own_changes, self.notify_own_changes),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        prefs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_table() {
        let prefs = NotificationPreferences::defaults(OwnerId::nil());
        assert!(prefs.allows(Subtype::BinsEvening));
        assert!(!prefs.allows(Subtype::BinsMorning));
        assert!(prefs.allows(Subtype::CalendarReminder15m));
        assert!(!prefs.allows(Subtype::CalendarReminder1d));
        assert!(!prefs.allows(Subtype::F1Session), "f1 category is opt-in");
        assert!(!prefs.notify_own_changes);
    }

    #[test]
    fn master_switch_overrides_everything() {
        let mut prefs = NotificationPreferences::defaults(OwnerId::nil());
        prefs.master_enabled = false;
        for subtype in [
            Subtype::CalendarReminder15m,
            Subtype::BinsEvening,
            Subtype::ChoreDue,
            Subtype::ShoppingAdded,
        ] {
            assert!(!prefs.allows(subtype));
        }
    }

    #[test]
    fn category_off_blocks_enabled_subtype() {
        let mut prefs = NotificationPreferences::defaults(OwnerId::nil());
        prefs.calendar_enabled = false;
        assert!(prefs.calendar_reminder_15m);
        assert!(!prefs.allows(Subtype::CalendarReminder15m));
    }

    #[test]
    fn update_only_touches_given_fields() {
        let update: PreferencesUpdate =
            serde_json::from_str(r#"{"f1_enabled": true, "bins_morning": true}"#).unwrap();
        let prefs = update.apply(NotificationPreferences::defaults(OwnerId::nil()));
        assert!(prefs.allows(Subtype::F1Session));
        assert!(prefs.allows(Subtype::BinsMorning));
        assert!(prefs.allows(Subtype::BinsEvening));
        assert!(!prefs.f1_news);
    }

    #[test]
    fn update_rejects_unknown_fields() {
        assert!(serde_json::from_str::<PreferencesUpdate>(r#"{"weather": true}"#).is_err());
    }
}
