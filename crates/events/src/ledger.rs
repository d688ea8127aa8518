//! Append-only record of dispatch attempts.
//!
//! Writes never fail the caller: a store error is logged and counted, and
//! [`NotificationLedger::is_degraded`] reports that the log is incomplete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Duration;
use hearth_core::categories::{NotificationCategory, Subtype};
use hearth_core::clock::Clock;
use hearth_core::types::{DbId, OwnerId};
use hearth_db::models::notification_log::{DedupeQuery, LedgerEntry, LedgerStatus, NewLedgerEntry};
use hearth_db::stores::LedgerStore;

/// Maximum page size for inbox listings.
pub const MAX_PAGE_SIZE: i64 = 100;

/// What to record about one dispatch to one owner.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub owner_id: OwnerId,
    pub subtype: Subtype,
    pub reference_id: Option<String>,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub delivered: bool,
}

pub struct NotificationLedger {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    failed_writes: AtomicU64,
}

impl NotificationLedger {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Record a dispatch as `sent` or `failed`. Returns the entry id, or
    /// `None` if the write was lost.
    pub async fn append(&self, record: LedgerRecord) -> Option<DbId> {
        let entry = NewLedgerEntry {
            owner_id: record.owner_id,
            category: record.subtype.category().as_str().to_string(),
            notification_type: record.subtype.as_str().to_string(),
            reference_id: record.reference_id,
            title: record.title,
            body: record.body,
            payload: record.payload,
            status: if record.delivered {
                LedgerStatus::Sent
            } else {
                LedgerStatus::Failed
            },
            created_at: self.clock.now(),
        };

        match self.store.insert_entry(&entry).await {
            Ok(id) => Some(id),
            Err(e) => {
                let failed = self.failed_writes.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    owner_id = %entry.owner_id,
                    notification_type = %entry.notification_type,
                    failed_writes = failed,
                    error = %e,
                    "Notification ledger write failed"
                );
                None
            }
        }
    }

    /// Whether a matching `sent` entry exists within the last
    /// `within_hours`. Best effort: a store error reads as `false`.
    pub async fn was_already_sent(
        &self,
        owner_id: OwnerId,
        category: NotificationCategory,
        notification_type: &str,
        reference_id: &str,
        within_hours: i64,
    ) -> bool {
        let query = DedupeQuery {
            owner_id,
            category: category.as_str(),
            notification_type,
            reference_id,
            since: self.clock.now() - Duration::hours(within_hours),
        };
        match self.store.entry_exists_since(&query).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(owner_id = %owner_id, error = %e, "Ledger dedupe lookup failed");
                false
            }
        }
    }

    /// True once any write has been lost since startup.
    pub fn is_degraded(&self) -> bool {
        self.failed_writes() > 0
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// A member's inbox, newest first, without dismissed entries.
    pub async fn list_for_owner(
        &self,
        owner_id: OwnerId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        self.store
            .entries_for_owner(owner_id, limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
            .await
    }

    pub async fn mark_read(&self, id: DbId, owner_id: OwnerId) -> Result<bool, sqlx::Error> {
        self.store
            .transition_entry(id, owner_id, LedgerStatus::Read)
            .await
    }

    pub async fn dismiss(&self, id: DbId, owner_id: OwnerId) -> Result<bool, sqlx::Error> {
        self.store
            .transition_entry(id, owner_id, LedgerStatus::Dismissed)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::clock::ManualClock;
    use hearth_db::MemoryStore;
    use uuid::Uuid;

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, NotificationLedger) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let ledger = NotificationLedger::new(store.clone(), clock.clone());
        (store, clock, ledger)
    }

    fn record(owner: OwnerId, reference: &str, delivered: bool) -> LedgerRecord {
        LedgerRecord {
            owner_id: owner,
            subtype: Subtype::F1News,
            reference_id: Some(reference.to_string()),
            title: "F1 news".into(),
            body: "Headline".into(),
            payload: serde_json::json!({"link": "https://example.com"}),
            delivered,
        }
    }

    #[tokio::test]
    async fn append_records_status_and_category() {
        let (store, _clock, ledger) = setup();
        let owner = Uuid::new_v4();
        ledger.append(record(owner, "a", true)).await.unwrap();
        ledger.append(record(owner, "b", false)).await.unwrap();

        let entries = store.ledger_entries();
        assert_eq!(entries[0].status, "sent");
        assert_eq!(entries[0].category, "f1");
        assert_eq!(entries[0].notification_type, "f1_news");
        assert_eq!(entries[1].status, "failed");
    }

    #[tokio::test]
    async fn store_failure_is_swallowed_and_counted() {
        let (store, _clock, ledger) = setup();
        store.fail_ledger_writes(true);
        assert!(!ledger.is_degraded());

        assert_eq!(ledger.append(record(Uuid::new_v4(), "a", true)).await, None);
        assert!(ledger.is_degraded());
        assert_eq!(ledger.failed_writes(), 1);
    }

    #[tokio::test]
    async fn was_already_sent_respects_window() {
        let (_store, clock, ledger) = setup();
        let owner = Uuid::new_v4();
        ledger.append(record(owner, "story", true)).await;

        let sent = |hours| {
            ledger.was_already_sent(owner, NotificationCategory::F1, "f1_news", "story", hours)
        };
        assert!(sent(72).await);

        clock.advance(Duration::hours(73));
        assert!(!sent(72).await);
    }

    #[tokio::test]
    async fn failed_dispatch_does_not_count_as_sent() {
        let (_store, _clock, ledger) = setup();
        let owner = Uuid::new_v4();
        ledger.append(record(owner, "story", false)).await;
        assert!(
            !ledger
                .was_already_sent(owner, NotificationCategory::F1, "f1_news", "story", 72)
                .await
        );
    }

    #[tokio::test]
    async fn inbox_read_then_dismiss() {
        let (_store, _clock, ledger) = setup();
        let owner = Uuid::new_v4();
        let id = ledger.append(record(owner, "story", true)).await.unwrap();

        assert_eq!(ledger.list_for_owner(owner, 20, 0).await.unwrap().len(), 1);
        assert!(ledger.mark_read(id, owner).await.unwrap());
        assert!(!ledger.mark_read(id, Uuid::new_v4()).await.unwrap());
        assert!(ledger.dismiss(id, owner).await.unwrap());
        assert!(ledger.list_for_owner(owner, 20, 0).await.unwrap().is_empty());
    }
}
