//! In-process store with the same marker and ledger semantics as [`PgStore`].
//!
//! [`PgStore`]: crate::PgStore

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use hearth_core::categories::Platform;
use hearth_core::preferences::NotificationPreferences;
use hearth_core::reminders::{BinRun, LeadTime};
use hearth_core::types::{DbId, OwnerId, Timestamp};

use crate::models::device_token::DeviceToken;
use crate::models::household::{BinCollection, CalendarEvent, Chore, ShoppingItem};
use crate::models::integration::{OAuthIntegration, RefreshedTokens, UpsertIntegration};
use crate::models::notification_log::{DedupeQuery, LedgerEntry, LedgerStatus, NewLedgerEntry};
use crate::stores::{
    CalendarStore, DeviceTokenStore, HouseholdStore, IntegrationStore, LedgerStore,
    PreferenceStore,
};

#[derive(Default)]
struct State {
    next_id: DbId,
    devices: Vec<DeviceToken>,
    preferences: HashMap<OwnerId, NotificationPreferences>,
    integrations: Vec<OAuthIntegration>,
    ledger: Vec<LedgerEntry>,
    events: Vec<CalendarEvent>,
    bins: Vec<BinCollection>,
    chores: Vec<Chore>,
    shopping: Vec<ShoppingItem>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// Memory-backed implementation of every storage trait.
///
/// Ledger writes and preference reads can be made to fail with
/// [`MemoryStore::fail_ledger_writes`] and
/// [`MemoryStore::fail_preference_reads`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_ledger: AtomicBool,
    fail_preferences: AtomicBool,
}

fn injected(what: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected {what} failure"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-write; the data is
        // still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail_ledger_writes(&self, fail: bool) {
        self.fail_ledger.store(fail, Ordering::SeqCst);
    }

    pub fn fail_preference_reads(&self, fail: bool) {
        self.fail_preferences.store(fail, Ordering::SeqCst);
    }

    // -- seeding ------------------------------------------------------------

    pub fn add_calendar_event(
        &self,
        owner_id: OwnerId,
        title: &str,
        starts_at: Timestamp,
        all_day: bool,
    ) -> DbId {
        let mut state = self.lock();
        let id = state.next_id();
        state.events.push(CalendarEvent {
            id,
            owner_id,
            title: title.to_string(),
            location: None,
            starts_at,
            all_day,
            reminder_15m_sent_at: None,
            reminder_30m_sent_at: None,
            reminder_1h_sent_at: None,
            reminder_1d_sent_at: None,
        });
        id
    }

    pub fn set_event_marker(&self, id: DbId, lead: LeadTime, at: Option<Timestamp>) {
        let mut state = self.lock();
        if let Some(event) = state.events.iter_mut().find(|e| e.id == id) {
            *event.marker_mut(lead) = at;
        }
    }

    pub fn add_bin_collection(&self, date: NaiveDate, bin_types: &[&str]) -> DbId {
        let mut state = self.lock();
        let id = state.next_id();
        state.bins.push(BinCollection {
            id,
            collection_date: date,
            bin_types: bin_types.iter().map(|b| b.to_string()).collect(),
            evening_reminder_sent_at: None,
            morning_reminder_sent_at: None,
        });
        id
    }

    pub fn bin_collection(&self, id: DbId) -> Option<BinCollection> {
        self.lock().bins.iter().find(|b| b.id == id).cloned()
    }

    pub fn add_chore(&self, title: &str, assignee_id: Option<OwnerId>, due_date: NaiveDate) -> DbId {
        let mut state = self.lock();
        let id = state.next_id();
        state.chores.push(Chore {
            id,
            title: title.to_string(),
            assignee_id,
            due_date,
            completed: false,
            reminder_sent_at: None,
        });
        id
    }

    pub fn chore(&self, id: DbId) -> Option<Chore> {
        self.lock().chores.iter().find(|c| c.id == id).cloned()
    }

    pub fn add_shopping_item(&self, name: &str, added_by: OwnerId, created_at: Timestamp) -> DbId {
        let mut state = self.lock();
        let id = state.next_id();
        state.shopping.push(ShoppingItem {
            id,
            name: name.to_string(),
            added_by,
            created_at,
            announced_at: None,
        });
        id
    }

    pub fn shopping_item(&self, id: DbId) -> Option<ShoppingItem> {
        self.lock().shopping.iter().find(|s| s.id == id).cloned()
    }

    /// Every ledger entry, including dismissed ones, in insertion order.
    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.lock().ledger.clone()
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

#[async_trait]
impl DeviceTokenStore for MemoryStore {
    async fn upsert_device(
        &self,
        owner_id: OwnerId,
        token: &str,
        platform: Platform,
        registered_at: Timestamp,
    ) -> Result<DeviceToken, sqlx::Error> {
        let mut state = self.lock();
        if let Some(existing) = state
            .devices
            .iter_mut()
            .find(|d| d.owner_id == owner_id && d.token == token)
        {
            existing.platform = platform.as_str().to_string();
            existing.registered_at = registered_at;
            return Ok(existing.clone());
        }
        let id = state.next_id();
        let device = DeviceToken {
            id,
            owner_id,
            token: token.to_string(),
            platform: platform.as_str().to_string(),
            registered_at,
        };
        state.devices.push(device.clone());
        Ok(device)
    }

    async fn devices_for_owner(&self, owner_id: OwnerId) -> Result<Vec<DeviceToken>, sqlx::Error> {
        let mut devices: Vec<DeviceToken> = self
            .lock()
            .devices
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| b.registered_at.cmp(&a.registered_at).then(b.id.cmp(&a.id)));
        Ok(devices)
    }

    async fn household(&self) -> Result<Vec<OwnerId>, sqlx::Error> {
        let owners: BTreeSet<OwnerId> = self.lock().devices.iter().map(|d| d.owner_id).collect();
        Ok(owners.into_iter().collect())
    }

    async fn remove_device(&self, owner_id: OwnerId, token: &str) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        let before = state.devices.len();
        state
            .devices
            .retain(|d| !(d.owner_id == owner_id && d.token == token));
        Ok(state.devices.len() < before)
    }

    async fn prune_token(&self, token: &str) -> Result<u64, sqlx::Error> {
        let mut state = self.lock();
        let before = state.devices.len();
        state.devices.retain(|d| d.token != token);
        Ok((before - state.devices.len()) as u64)
    }

    async fn retain_newest_device(&self, owner_id: OwnerId) -> Result<u64, sqlx::Error> {
        let mut state = self.lock();
        let newest = state
            .devices
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .max_by(|a, b| a.registered_at.cmp(&b.registered_at).then(a.id.cmp(&b.id)))
            .map(|d| d.id);
        let Some(keep) = newest else {
            return Ok(0);
        };
        let before = state.devices.len();
        state
            .devices
            .retain(|d| d.owner_id != owner_id || d.id == keep);
        Ok((before - state.devices.len()) as u64)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn preferences(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<NotificationPreferences>, sqlx::Error> {
        if self.fail_preferences.load(Ordering::SeqCst) {
            return Err(injected("preference read"));
        }
        Ok(self.lock().preferences.get(&owner_id).cloned())
    }

    async fn save_preferences(
        &self,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, sqlx::Error> {
        self.lock().preferences.insert(prefs.owner_id, prefs.clone());
        Ok(prefs.clone())
    }
}

#[async_trait]
impl IntegrationStore for MemoryStore {
    async fn integration(
        &self,
        owner_id: OwnerId,
        provider: &str,
    ) -> Result<Option<OAuthIntegration>, sqlx::Error> {
        Ok(self
            .lock()
            .integrations
            .iter()
            .find(|i| i.owner_id == owner_id && i.provider == provider)
            .cloned())
    }

    async fn upsert_integration(&self, input: &UpsertIntegration) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let mut state = self.lock();
        if let Some(existing) = state
            .integrations
            .iter_mut()
            .find(|i| i.owner_id == input.owner_id && i.provider == input.provider)
        {
            existing.encrypted_access_token = input.encrypted_access_token.clone();
            existing.encrypted_refresh_token = input.encrypted_refresh_token.clone();
            existing.expires_at = input.expires_at;
            existing.provider_user_id = input.provider_user_id.clone();
            existing.updated_at = now;
            return Ok(());
        }
        let id = state.next_id();
        state.integrations.push(OAuthIntegration {
            id,
            owner_id: input.owner_id,
            provider: input.provider.clone(),
            encrypted_access_token: input.encrypted_access_token.clone(),
            encrypted_refresh_token: input.encrypted_refresh_token.clone(),
            expires_at: input.expires_at,
            provider_user_id: input.provider_user_id.clone(),
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn update_tokens(
        &self,
        owner_id: OwnerId,
        provider: &str,
        tokens: &RefreshedTokens,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        let Some(existing) = state
            .integrations
            .iter_mut()
            .find(|i| i.owner_id == owner_id && i.provider == provider)
        else {
            return Ok(false);
        };
        existing.encrypted_access_token = tokens.encrypted_access_token.clone();
        if let Some(refresh) = &tokens.encrypted_refresh_token {
            existing.encrypted_refresh_token = refresh.clone();
        }
        existing.expires_at = tokens.expires_at;
        existing.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_integration(
        &self,
        owner_id: OwnerId,
        provider: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        let before = state.integrations.len();
        state
            .integrations
            .retain(|i| !(i.owner_id == owner_id && i.provider == provider));
        Ok(state.integrations.len() < before)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_entry(&self, entry: &NewLedgerEntry) -> Result<DbId, sqlx::Error> {
        if self.fail_ledger.load(Ordering::SeqCst) {
            return Err(injected("ledger write"));
        }
        let mut state = self.lock();
        let id = state.next_id();
        state.ledger.push(LedgerEntry {
            id,
            owner_id: entry.owner_id,
            category: entry.category.clone(),
            notification_type: entry.notification_type.clone(),
            reference_id: entry.reference_id.clone(),
            title: entry.title.clone(),
            body: entry.body.clone(),
            payload: entry.payload.clone(),
            status: entry.status.as_str().to_string(),
            created_at: entry.created_at,
        });
        Ok(id)
    }

    async fn entry_exists_since(&self, query: &DedupeQuery<'_>) -> Result<bool, sqlx::Error> {
        Ok(self.lock().ledger.iter().any(|e| {
            e.owner_id == query.owner_id
                && e.category == query.category
                && e.notification_type == query.notification_type
                && e.reference_id.as_deref() == Some(query.reference_id)
                && e.created_at >= query.since
                && e.status != LedgerStatus::Failed.as_str()
        }))
    }

    async fn entries_for_owner(
        &self,
        owner_id: OwnerId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let mut entries: Vec<LedgerEntry> = self
            .lock()
            .ledger
            .iter()
            .filter(|e| e.owner_id == owner_id && e.status != LedgerStatus::Dismissed.as_str())
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn transition_entry(
        &self,
        id: DbId,
        owner_id: OwnerId,
        to: LedgerStatus,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        let Some(entry) = state
            .ledger
            .iter_mut()
            .find(|e| e.id == id && e.owner_id == owner_id)
        else {
            return Ok(false);
        };
        if !to.allowed_from().iter().any(|s| s.as_str() == entry.status) {
            return Ok(false);
        }
        entry.status = to.as_str().to_string();
        Ok(true)
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn event(&self, id: DbId) -> Result<Option<CalendarEvent>, sqlx::Error> {
        Ok(self.lock().events.iter().find(|e| e.id == id).cloned())
    }

    async fn events_due(
        &self,
        lead: LeadTime,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<CalendarEvent>, sqlx::Error> {
        let mut events: Vec<CalendarEvent> = self
            .lock()
            .events
            .iter()
            .filter(|e| {
                !e.all_day && e.starts_at >= start && e.starts_at <= end && e.marker(lead).is_none()
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn claim_event(
        &self,
        id: DbId,
        lead: LeadTime,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        match state.events.iter_mut().find(|e| e.id == id) {
            Some(event) if event.marker(lead).is_none() => {
                *event.marker_mut(lead) = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_event(
        &self,
        id: DbId,
        lead: LeadTime,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        match state.events.iter_mut().find(|e| e.id == id) {
            Some(event) if event.marker(lead) == Some(at) => {
                *event.marker_mut(lead) = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl HouseholdStore for MemoryStore {
    async fn bins_due(
        &self,
        date: NaiveDate,
        run: BinRun,
    ) -> Result<Vec<BinCollection>, sqlx::Error> {
        Ok(self
            .lock()
            .bins
            .iter()
            .filter(|b| b.collection_date == date && b.marker(run).is_none())
            .cloned()
            .collect())
    }

    async fn claim_bin(&self, id: DbId, run: BinRun, at: Timestamp) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        match state.bins.iter_mut().find(|b| b.id == id) {
            Some(bin) if bin.marker(run).is_none() => {
                *bin.marker_mut(run) = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_bin(
        &self,
        id: DbId,
        run: BinRun,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        match state.bins.iter_mut().find(|b| b.id == id) {
            Some(bin) if bin.marker(run) == Some(at) => {
                *bin.marker_mut(run) = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn chores_due(&self, date: NaiveDate) -> Result<Vec<Chore>, sqlx::Error> {
        Ok(self
            .lock()
            .chores
            .iter()
            .filter(|c| c.due_date == date && !c.completed && c.reminder_sent_at.is_none())
            .cloned()
            .collect())
    }

    async fn claim_chore(&self, id: DbId, at: Timestamp) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        match state.chores.iter_mut().find(|c| c.id == id) {
            Some(chore) if chore.reminder_sent_at.is_none() => {
                chore.reminder_sent_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_chore(&self, id: DbId, at: Timestamp) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        match state.chores.iter_mut().find(|c| c.id == id) {
            Some(chore) if chore.reminder_sent_at == Some(at) => {
                chore.reminder_sent_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unannounced_items(&self) -> Result<Vec<ShoppingItem>, sqlx::Error> {
        let mut items: Vec<ShoppingItem> = self
            .lock()
            .shopping
            .iter()
            .filter(|s| s.announced_at.is_none())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn claim_items(&self, ids: &[DbId], at: Timestamp) -> Result<Vec<DbId>, sqlx::Error> {
        let mut state = self.lock();
        let mut claimed = Vec::new();
        for item in state.shopping.iter_mut() {
            if ids.contains(&item.id) && item.announced_at.is_none() {
                item.announced_at = Some(at);
                claimed.push(item.id);
            }
        }
        Ok(claimed)
    }

    async fn release_items(&self, ids: &[DbId], at: Timestamp) -> Result<u64, sqlx::Error> {
        let mut state = self.lock();
        let mut released = 0;
        for item in state.shopping.iter_mut() {
            if ids.contains(&item.id) && item.announced_at == Some(at) {
                item.announced_at = None;
                released += 1;
            }
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn event_claim_is_compare_and_set() {
        let store = MemoryStore::new();
        let id = store.add_calendar_event(Uuid::new_v4(), "Dentist", at(10, 0), false);

        assert!(store.claim_event(id, LeadTime::Minutes15, at(9, 45)).await.unwrap());
        assert!(!store.claim_event(id, LeadTime::Minutes15, at(9, 46)).await.unwrap());
        // Other lead times are independent.
        assert!(store.claim_event(id, LeadTime::Hour1, at(9, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn release_only_clears_matching_claim() {
        let store = MemoryStore::new();
        let id = store.add_chore("Hoover", None, at(0, 0).date_naive());

        assert!(store.claim_chore(id, at(8, 0)).await.unwrap());
        assert!(!store.release_chore(id, at(8, 1)).await.unwrap());
        assert!(store.chore(id).unwrap().reminder_sent_at.is_some());
        assert!(store.release_chore(id, at(8, 0)).await.unwrap());
        assert!(store.chore(id).unwrap().reminder_sent_at.is_none());
    }

    #[tokio::test]
    async fn events_due_skips_all_day_and_marked() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let timed = store.add_calendar_event(owner, "Timed", at(10, 0), false);
        store.add_calendar_event(owner, "Holiday", at(10, 0), true);
        let marked = store.add_calendar_event(owner, "Marked", at(10, 5), false);
        store.set_event_marker(marked, LeadTime::Minutes15, Some(at(9, 50)));

        let due = store
            .events_due(LeadTime::Minutes15, at(9, 0), at(11, 0))
            .await
            .unwrap();
        assert_eq!(due.iter().map(|e| e.id).collect::<Vec<_>>(), vec![timed]);
    }

    #[tokio::test]
    async fn shopping_claim_returns_only_won_ids() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let a = store.add_shopping_item("Milk", owner, at(9, 0));
        let b = store.add_shopping_item("Eggs", owner, at(9, 1));

        assert_eq!(store.claim_items(&[a], at(10, 0)).await.unwrap(), vec![a]);
        assert_eq!(store.claim_items(&[a, b], at(10, 5)).await.unwrap(), vec![b]);
        assert_eq!(store.release_items(&[a, b], at(10, 0)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn retain_newest_device_keeps_latest_registration() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store
            .upsert_device(owner, "old", Platform::Ios, at(8, 0))
            .await
            .unwrap();
        store
            .upsert_device(owner, "new", Platform::Ios, at(9, 0))
            .await
            .unwrap();

        assert_eq!(store.retain_newest_device(owner).await.unwrap(), 1);
        let devices = store.devices_for_owner(owner).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].token, "new");
    }

    #[tokio::test]
    async fn ledger_transitions_only_move_forward() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let id = store
            .insert_entry(&NewLedgerEntry {
                owner_id: owner,
                category: "chores".into(),
                notification_type: "chore_due".into(),
                reference_id: Some("7".into()),
                title: "Chore due".into(),
                body: "Hoover".into(),
                payload: serde_json::json!({}),
                status: LedgerStatus::Sent,
                created_at: at(8, 0),
            })
            .await
            .unwrap();

        assert!(!store.transition_entry(id, Uuid::new_v4(), LedgerStatus::Read).await.unwrap());
        assert!(store.transition_entry(id, owner, LedgerStatus::Read).await.unwrap());
        assert!(store.transition_entry(id, owner, LedgerStatus::Dismissed).await.unwrap());
        assert!(!store.transition_entry(id, owner, LedgerStatus::Read).await.unwrap());
        assert!(store.entries_for_owner(owner, 50, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dedupe_ignores_failed_and_old_entries() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let mut entry = NewLedgerEntry {
            owner_id: owner,
            category: "f1".into(),
            notification_type: "f1_news".into(),
            reference_id: Some("abc".into()),
            title: "News".into(),
            body: "Headline".into(),
            payload: serde_json::json!({}),
            status: LedgerStatus::Failed,
            created_at: at(12, 0),
        };
        store.insert_entry(&entry).await.unwrap();

        let query = DedupeQuery {
            owner_id: owner,
            category: "f1",
            notification_type: "f1_news",
            reference_id: "abc",
            since: at(12, 0) - Duration::hours(72),
        };
        assert!(!store.entry_exists_since(&query).await.unwrap());

        entry.status = LedgerStatus::Sent;
        entry.created_at = at(12, 0) - Duration::hours(100);
        store.insert_entry(&entry).await.unwrap();
        assert!(!store.entry_exists_since(&query).await.unwrap());

        entry.created_at = at(11, 0);
        store.insert_entry(&entry).await.unwrap();
        assert!(store.entry_exists_since(&query).await.unwrap());
    }

    #[tokio::test]
    async fn injected_ledger_failure() {
        let store = MemoryStore::new();
        store.fail_ledger_writes(true);
        let result = store
            .insert_entry(&NewLedgerEntry {
                owner_id: Uuid::new_v4(),
                category: "bins".into(),
                notification_type: "bins_evening".into(),
                reference_id: None,
                title: "Bins".into(),
                body: "Tomorrow".into(),
                payload: serde_json::json!({}),
                status: LedgerStatus::Sent,
                created_at: at(19, 0),
            })
            .await;
        assert!(result.is_err());
        assert!(store.ledger_entries().is_empty());
    }
}
