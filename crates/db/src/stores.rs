//! Storage-boundary traits consumed by the delivery engine.
//!
//! Every marker mutation is a compare-and-set: `claim_*` only succeeds while
//! the marker is null, `release_*` only clears a marker written at the same
//! instant. [`PgStore`] implements all traits on top of the repositories;
//! [`crate::MemoryStore`] implements them in-process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use hearth_core::categories::Platform;
use hearth_core::preferences::NotificationPreferences;
use hearth_core::reminders::{BinRun, LeadTime};
use hearth_core::types::{DbId, OwnerId, Timestamp};

use crate::models::device_token::DeviceToken;
use crate::models::household::{BinCollection, CalendarEvent, Chore, ShoppingItem};
use crate::models::integration::{OAuthIntegration, RefreshedTokens, UpsertIntegration};
use crate::models::notification_log::{DedupeQuery, LedgerEntry, LedgerStatus, NewLedgerEntry};
use crate::repositories::{
    BinCollectionRepo, CalendarEventRepo, ChoreRepo, DeviceTokenRepo, IntegrationRepo,
    NotificationLogRepo, NotificationPreferenceRepo, ShoppingItemRepo,
};
use crate::DbPool;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DeviceTokenStore: Send + Sync {
    async fn upsert_device(
        &self,
        owner_id: OwnerId,
        token: &str,
        platform: Platform,
        registered_at: Timestamp,
    ) -> Result<DeviceToken, sqlx::Error>;
    async fn devices_for_owner(&self, owner_id: OwnerId) -> Result<Vec<DeviceToken>, sqlx::Error>;
    /// Members with at least one device; the broadcast audience.
    async fn household(&self) -> Result<Vec<OwnerId>, sqlx::Error>;
    async fn remove_device(&self, owner_id: OwnerId, token: &str) -> Result<bool, sqlx::Error>;
    async fn prune_token(&self, token: &str) -> Result<u64, sqlx::Error>;
    async fn retain_newest_device(&self, owner_id: OwnerId) -> Result<u64, sqlx::Error>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn preferences(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<NotificationPreferences>, sqlx::Error>;
    async fn save_preferences(
        &self,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, sqlx::Error>;
}

#[async_trait]
pub trait IntegrationStore: Send + Sync {
    async fn integration(
        &self,
        owner_id: OwnerId,
        provider: &str,
    ) -> Result<Option<OAuthIntegration>, sqlx::Error>;
    async fn upsert_integration(&self, input: &UpsertIntegration) -> Result<(), sqlx::Error>;
    async fn update_tokens(
        &self,
        owner_id: OwnerId,
        provider: &str,
        tokens: &RefreshedTokens,
    ) -> Result<bool, sqlx::Error>;
    async fn delete_integration(&self, owner_id: OwnerId, provider: &str)
        -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_entry(&self, entry: &NewLedgerEntry) -> Result<DbId, sqlx::Error>;
    async fn entry_exists_since(&self, query: &DedupeQuery<'_>) -> Result<bool, sqlx::Error>;
    async fn entries_for_owner(
        &self,
        owner_id: OwnerId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error>;
    async fn transition_entry(
        &self,
        id: DbId,
        owner_id: OwnerId,
        to: LedgerStatus,
    ) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn event(&self, id: DbId) -> Result<Option<CalendarEvent>, sqlx::Error>;
    async fn events_due(
        &self,
        lead: LeadTime,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<CalendarEvent>, sqlx::Error>;
    async fn claim_event(&self, id: DbId, lead: LeadTime, at: Timestamp)
        -> Result<bool, sqlx::Error>;
    async fn release_event(
        &self,
        id: DbId,
        lead: LeadTime,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait HouseholdStore: Send + Sync {
    async fn bins_due(&self, date: NaiveDate, run: BinRun)
        -> Result<Vec<BinCollection>, sqlx::Error>;
    async fn claim_bin(&self, id: DbId, run: BinRun, at: Timestamp) -> Result<bool, sqlx::Error>;
    async fn release_bin(&self, id: DbId, run: BinRun, at: Timestamp)
        -> Result<bool, sqlx::Error>;

    async fn chores_due(&self, date: NaiveDate) -> Result<Vec<Chore>, sqlx::Error>;
    async fn claim_chore(&self, id: DbId, at: Timestamp) -> Result<bool, sqlx::Error>;
    async fn release_chore(&self, id: DbId, at: Timestamp) -> Result<bool, sqlx::Error>;

    async fn unannounced_items(&self) -> Result<Vec<ShoppingItem>, sqlx::Error>;
    async fn claim_items(&self, ids: &[DbId], at: Timestamp) -> Result<Vec<DbId>, sqlx::Error>;
    async fn release_items(&self, ids: &[DbId], at: Timestamp) -> Result<u64, sqlx::Error>;
}

// ---------------------------------------------------------------------------
// Stores bundle
// ---------------------------------------------------------------------------

/// All storage handles the engine needs, cheaply cloneable.
#[derive(Clone)]
pub struct Stores {
    pub devices: Arc<dyn DeviceTokenStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub integrations: Arc<dyn IntegrationStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub calendar: Arc<dyn CalendarStore>,
    pub household: Arc<dyn HouseholdStore>,
}

impl Stores {
    /// Every handle backed by the same store instance.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: DeviceTokenStore
            + PreferenceStore
            + IntegrationStore
            + LedgerStore
            + CalendarStore
            + HouseholdStore
            + 'static,
    {
        Self {
            devices: store.clone(),
            preferences: store.clone(),
            integrations: store.clone(),
            ledger: store.clone(),
            calendar: store.clone(),
            household: store,
        }
    }

    pub fn postgres(pool: DbPool) -> Self {
        Self::from_shared(Arc::new(PgStore::new(pool)))
    }
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// PostgreSQL implementation of every storage trait.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl DeviceTokenStore for PgStore {
    async fn upsert_device(
        &self,
        owner_id: OwnerId,
        token: &str,
        platform: Platform,
        registered_at: Timestamp,
    ) -> Result<DeviceToken, sqlx::Error> {
        DeviceTokenRepo::upsert(&self.pool, owner_id, token, platform, registered_at).await
    }

    async fn devices_for_owner(&self, owner_id: OwnerId) -> Result<Vec<DeviceToken>, sqlx::Error> {
        DeviceTokenRepo::list_for_owner(&self.pool, owner_id).await
    }

    async fn household(&self) -> Result<Vec<OwnerId>, sqlx::Error> {
        DeviceTokenRepo::list_owners(&self.pool).await
    }

    async fn remove_device(&self, owner_id: OwnerId, token: &str) -> Result<bool, sqlx::Error> {
        DeviceTokenRepo::delete(&self.pool, owner_id, token).await
    }

    async fn prune_token(&self, token: &str) -> Result<u64, sqlx::Error> {
        DeviceTokenRepo::delete_token(&self.pool, token).await
    }

    async fn retain_newest_device(&self, owner_id: OwnerId) -> Result<u64, sqlx::Error> {
        DeviceTokenRepo::retain_newest(&self.pool, owner_id).await
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn preferences(
        &self,
        owner_id: OwnerId,
    ) -> Result<Option<NotificationPreferences>, sqlx::Error> {
        Ok(NotificationPreferenceRepo::get(&self.pool, owner_id)
            .await?
            .map(Into::into))
    }

    async fn save_preferences(
        &self,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, sqlx::Error> {
        Ok(NotificationPreferenceRepo::upsert(&self.pool, prefs).await?.into())
    }
}

#[async_trait]
impl IntegrationStore for PgStore {
    async fn integration(
        &self,
        owner_id: OwnerId,
        provider: &str,
    ) -> Result<Option<OAuthIntegration>, sqlx::Error> {
        IntegrationRepo::find(&self.pool, owner_id, provider).await
    }

    async fn upsert_integration(&self, input: &UpsertIntegration) -> Result<(), sqlx::Error> {
        IntegrationRepo::upsert(&self.pool, input).await.map(|_| ())
    }

    async fn update_tokens(
        &self,
        owner_id: OwnerId,
        provider: &str,
        tokens: &RefreshedTokens,
    ) -> Result<bool, sqlx::Error> {
        IntegrationRepo::update_tokens(&self.pool, owner_id, provider, tokens).await
    }

    async fn delete_integration(
        &self,
        owner_id: OwnerId,
        provider: &str,
    ) -> Result<bool, sqlx::Error> {
        IntegrationRepo::delete(&self.pool, owner_id, provider).await
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn insert_entry(&self, entry: &NewLedgerEntry) -> Result<DbId, sqlx::Error> {
        NotificationLogRepo::insert(&self.pool, entry).await
    }

    async fn entry_exists_since(&self, query: &DedupeQuery<'_>) -> Result<bool, sqlx::Error> {
        NotificationLogRepo::exists_since(&self.pool, query).await
    }

    async fn entries_for_owner(
        &self,
        owner_id: OwnerId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        NotificationLogRepo::list_for_owner(&self.pool, owner_id, limit, offset).await
    }

    async fn transition_entry(
        &self,
        id: DbId,
        owner_id: OwnerId,
        to: LedgerStatus,
    ) -> Result<bool, sqlx::Error> {
        NotificationLogRepo::transition(&self.pool, id, owner_id, to).await
    }
}

#[async_trait]
impl CalendarStore for PgStore {
    async fn event(&self, id: DbId) -> Result<Option<CalendarEvent>, sqlx::Error> {
        CalendarEventRepo::find_by_id(&self.pool, id).await
    }

    async fn events_due(
        &self,
        lead: LeadTime,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<CalendarEvent>, sqlx::Error> {
        CalendarEventRepo::due_for_reminder(&self.pool, lead, start, end).await
    }

    async fn claim_event(
        &self,
        id: DbId,
        lead: LeadTime,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        CalendarEventRepo::claim_reminder(&self.pool, id, lead, at).await
    }

    async fn release_event(
        &self,
        id: DbId,
        lead: LeadTime,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        CalendarEventRepo::release_reminder(&self.pool, id, lead, at).await
    }
}

#[async_trait]
impl HouseholdStore for PgStore {
    async fn bins_due(
        &self,
        date: NaiveDate,
        run: BinRun,
    ) -> Result<Vec<BinCollection>, sqlx::Error> {
        BinCollectionRepo::due_on(&self.pool, date, run).await
    }

    async fn claim_bin(&self, id: DbId, run: BinRun, at: Timestamp) -> Result<bool, sqlx::Error> {
        BinCollectionRepo::claim(&self.pool, id, run, at).await
    }

    async fn release_bin(
        &self,
        id: DbId,
        run: BinRun,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        BinCollectionRepo::release(&self.pool, id, run, at).await
    }

    async fn chores_due(&self, date: NaiveDate) -> Result<Vec<Chore>, sqlx::Error> {
        ChoreRepo::due_on(&self.pool, date).await
    }

    async fn claim_chore(&self, id: DbId, at: Timestamp) -> Result<bool, sqlx::Error> {
        ChoreRepo::claim(&self.pool, id, at).await
    }

    async fn release_chore(&self, id: DbId, at: Timestamp) -> Result<bool, sqlx::Error> {
        ChoreRepo::release(&self.pool, id, at).await
    }

    async fn unannounced_items(&self) -> Result<Vec<ShoppingItem>, sqlx::Error> {
        ShoppingItemRepo::unannounced(&self.pool).await
    }

    async fn claim_items(&self, ids: &[DbId], at: Timestamp) -> Result<Vec<DbId>, sqlx::Error> {
        ShoppingItemRepo::claim(&self.pool, ids, at).await
    }

    async fn release_items(&self, ids: &[DbId], at: Timestamp) -> Result<u64, sqlx::Error> {
        ShoppingItemRepo::release(&self.pool, ids, at).await
    }
}
