//! Calendar descriptors: lead-time reminders and change broadcasts.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::categories::{NotificationCategory, Subtype};
use hearth_core::reminders::LeadTime;
use hearth_core::types::{DbId, OwnerId, Timestamp};
use hearth_db::models::household::CalendarEvent;
use hearth_db::stores::CalendarStore;
use serde::Deserialize;

use super::{reminder_message, DueItem, Recipients, ReminderCategory, SchedulerError};

// ---------------------------------------------------------------------------
// CalendarReminders
// ---------------------------------------------------------------------------

/// Reminders for timed events starting inside one lead time's window.
pub struct CalendarReminders {
    store: Arc<dyn CalendarStore>,
    lead: LeadTime,
}

impl CalendarReminders {
    pub fn new(store: Arc<dyn CalendarStore>, lead: LeadTime) -> Self {
        Self { store, lead }
    }

    fn item(&self, event: &CalendarEvent) -> DueItem {
        let subtype = self.lead.subtype();
        let reference_id = format!("event-{}-{}", event.id, self.lead.as_str());
        let body = match &event.location {
            Some(location) => format!("Starts {} at {}", self.lead.phrase(), location),
            None => format!("Starts {}", self.lead.phrase()),
        };
        DueItem {
            message: reminder_message(&event.title, body, subtype, &reference_id)
                .with_data("event_id", event.id)
                .with_data("starts_at", event.starts_at.to_rfc3339()),
            reference_id,
            entity_ids: vec![event.id],
            recipients: Recipients::Owner(event.owner_id),
            subtype,
            dedupe_within_hours: None,
        }
    }
}

#[async_trait]
impl ReminderCategory for CalendarReminders {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::Calendar
    }

    fn run_type(&self) -> String {
        self.lead.as_str().to_string()
    }

    async fn due_items(&self, now: Timestamp) -> Result<Vec<DueItem>, SchedulerError> {
        let (start, end) = self.lead.window().bounds(now);
        let events = self.store.events_due(self.lead, start, end).await?;
        Ok(events.iter().map(|e| self.item(e)).collect())
    }

    async fn claim(&self, item: &DueItem, at: Timestamp) -> Result<bool, sqlx::Error> {
        match item.entity_ids.first() {
            Some(id) => self.store.claim_event(*id, self.lead, at).await,
            None => Ok(false),
        }
    }

    async fn release(&self, item: &DueItem, at: Timestamp) -> Result<(), sqlx::Error> {
        if let Some(id) = item.entity_ids.first() {
            self.store.release_event(*id, self.lead, at).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CalendarChange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

/// Broadcast that a member changed a shared event. Ledger-only, no marker.
pub struct CalendarChange {
    pub event_id: DbId,
    pub title: String,
    pub starts_at: Option<Timestamp>,
    pub kind: ChangeKind,
    pub actor: OwnerId,
}

#[async_trait]
impl ReminderCategory for CalendarChange {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::Calendar
    }

    fn run_type(&self) -> String {
        "changes".to_string()
    }

    async fn due_items(&self, now: Timestamp) -> Result<Vec<DueItem>, SchedulerError> {
        let subtype = Subtype::CalendarChanges;
        let reference_id = format!(
            "event-{}-{}-{}",
            self.event_id,
            self.kind.as_str(),
            now.timestamp()
        );
        let title = match self.kind {
            ChangeKind::Updated => "Calendar event updated",
            ChangeKind::Deleted => "Calendar event cancelled",
        };
        let body = match self.starts_at {
            Some(starts_at) => format!("{} ({})", self.title, starts_at.format("%a %-d %b, %H:%M")),
            None => self.title.clone(),
        };

        Ok(vec![DueItem {
            message: reminder_message(title, body, subtype, &reference_id)
                .with_data("event_id", self.event_id)
                .with_data("change", self.kind.as_str()),
            reference_id,
            entity_ids: Vec::new(),
            recipients: Recipients::Household {
                actor: Some(self.actor),
            },
            subtype,
            dedupe_within_hours: None,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::tests::{accepting_gateway, noon, push_scheduler, rejecting_gateway};
    use crate::scheduler::ReminderScheduler;
    use chrono::Duration;
    use hearth_core::categories::Platform;
    use hearth_core::clock::ManualClock;
    use hearth_db::stores::DeviceTokenStore;
    use hearth_db::MemoryStore;
    use uuid::Uuid;
    use wiremock::MockServer;

    fn setup(server: &MockServer) -> (Arc<MemoryStore>, ReminderScheduler) {
        let store = Arc::new(MemoryStore::new());
        let scheduler = push_scheduler(store.clone(), Arc::new(ManualClock::new(noon())), server);
        (store, scheduler)
    }

    #[tokio::test]
    async fn due_items_cover_the_lead_window_only() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let inside = store.add_calendar_event(owner, "Dentist", noon() + Duration::minutes(16), false);
        store.add_calendar_event(owner, "Later", noon() + Duration::minutes(25), false);
        store.add_calendar_event(owner, "Holiday", noon() + Duration::minutes(16), true);

        let descriptor = CalendarReminders::new(store.clone(), LeadTime::Minutes15);
        let items = descriptor.due_items(noon()).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].entity_ids, vec![inside]);
        assert_eq!(items[0].subtype, Subtype::CalendarReminder15m);
        assert_eq!(items[0].recipients, Recipients::Owner(owner));
        assert_eq!(items[0].message.title, "Dentist");
        assert_eq!(items[0].message.body, "Starts in 15 minutes");
    }

    #[tokio::test]
    async fn failed_delivery_releases_the_marker() {
        let server = rejecting_gateway().await;
        let (store, scheduler) = setup(&server);
        let owner = Uuid::new_v4();
        store
            .upsert_device(owner, "tok", Platform::Ios, noon())
            .await
            .unwrap();
        let id = store.add_calendar_event(owner, "Dentist", noon() + Duration::minutes(16), false);

        let summary = scheduler
            .run(&CalendarReminders::new(store.clone(), LeadTime::Minutes15))
            .await
            .unwrap();
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.sent, 0);

        let event = store.event(id).await.unwrap().unwrap();
        assert_eq!(event.marker(LeadTime::Minutes15), None);
    }

    #[tokio::test]
    async fn owner_with_no_devices_is_claimed_once_across_runs() {
        let server = accepting_gateway().await;
        let (store, scheduler) = setup(&server);
        let owner = Uuid::new_v4();
        let id = store.add_calendar_event(owner, "Dentist", noon() + Duration::minutes(16), false);
        let descriptor = CalendarReminders::new(store.clone(), LeadTime::Minutes15);

        let first = scheduler.run(&descriptor).await.unwrap();
        assert_eq!(first.items, 1);
        assert_eq!(first.attempted, 0);
        assert_eq!(first.skipped, 1);

        // Every cron tick inside the window sees the same event.
        for _ in 0..3 {
            let again = scheduler.run(&descriptor).await.unwrap();
            assert_eq!(again.items, 0);
            assert_eq!(again.skipped, 0);
        }

        let event = store.event(id).await.unwrap().unwrap();
        assert_eq!(event.marker(LeadTime::Minutes15), Some(noon()));
        assert!(store.ledger_entries().is_empty());
    }

    #[tokio::test]
    async fn delivered_reminder_is_not_repeated_within_the_window() {
        let server = accepting_gateway().await;
        let (store, scheduler) = setup(&server);
        let owner = Uuid::new_v4();
        store
            .upsert_device(owner, "tok", Platform::Ios, noon())
            .await
            .unwrap();
        store.add_calendar_event(owner, "Dentist", noon() + Duration::minutes(16), false);
        let descriptor = CalendarReminders::new(store.clone(), LeadTime::Minutes15);

        assert_eq!(scheduler.run(&descriptor).await.unwrap().sent, 1);
        assert_eq!(scheduler.run(&descriptor).await.unwrap().items, 0);
        assert_eq!(store.ledger_entries().len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabled_lead_time_skips_without_releasing() {
        let server = accepting_gateway().await;
        let (store, scheduler) = setup(&server);
        let owner = Uuid::new_v4();
        let id = store.add_calendar_event(owner, "Dentist", noon() + Duration::minutes(30), false);

        // 30m reminders are off by default.
        let summary = scheduler
            .run(&CalendarReminders::new(store.clone(), LeadTime::Minutes30))
            .await
            .unwrap();
        assert_eq!(summary.items, 1);
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.skipped, 1);

        let event = store.event(id).await.unwrap().unwrap();
        assert_eq!(event.marker(LeadTime::Minutes30), Some(noon()));
    }

    #[tokio::test]
    async fn change_broadcast_skips_the_actor() {
        let server = accepting_gateway().await;
        let (store, scheduler) = setup(&server);
        let actor = Uuid::new_v4();
        let partner = Uuid::new_v4();
        for (owner, token) in [(actor, "a"), (partner, "p")] {
            store
                .upsert_device(owner, token, Platform::Ios, noon())
                .await
                .unwrap();
        }

        let change = CalendarChange {
            event_id: 7,
            title: "Parents evening".into(),
            starts_at: Some(noon() + Duration::days(2)),
            kind: ChangeKind::Deleted,
            actor,
        };
        let summary = scheduler.run(&change).await.unwrap();

        assert_eq!(summary.run_type, "changes");
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.skipped, 1);
        let entries = store.ledger_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].owner_id, partner);
        assert_eq!(entries[0].notification_type, "calendar_changes");
        assert_eq!(entries[0].title, "Calendar event cancelled");
    }
}
