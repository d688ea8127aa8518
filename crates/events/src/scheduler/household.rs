//! Household descriptors: bin collections, chores and shopping additions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use hearth_core::categories::{NotificationCategory, Subtype};
use hearth_core::reminders::BinRun;
use hearth_core::types::{OwnerId, Timestamp};
use hearth_db::models::household::ShoppingItem;
use hearth_db::stores::HouseholdStore;

use super::{reminder_message, DueItem, Recipients, ReminderCategory, SchedulerError};

/// Item names listed in a shopping announcement before "and N more".
const SHOPPING_PREVIEW: usize = 3;

// ---------------------------------------------------------------------------
// Bins
// ---------------------------------------------------------------------------

/// Evening run: collections tomorrow. Morning run: collections today.
pub struct BinReminders {
    store: Arc<dyn HouseholdStore>,
    run: BinRun,
}

impl BinReminders {
    pub fn new(store: Arc<dyn HouseholdStore>, run: BinRun) -> Self {
        Self { store, run }
    }
}

#[async_trait]
impl ReminderCategory for BinReminders {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::Bins
    }

    fn run_type(&self) -> String {
        self.run.as_str().to_string()
    }

    async fn due_items(&self, now: Timestamp) -> Result<Vec<DueItem>, SchedulerError> {
        let today = now.date_naive();
        let date = match self.run {
            BinRun::Evening => today + Duration::days(1),
            BinRun::Morning => today,
        };
        let subtype = self.run.subtype();
        let title = match self.run {
            BinRun::Evening => "Bins go out tonight",
            BinRun::Morning => "Bin collection today",
        };

        let collections = self.store.bins_due(date, self.run).await?;
        Ok(collections
            .into_iter()
            .map(|bin| {
                let reference_id = format!("bins-{}-{}", bin.collection_date, self.run.as_str());
                DueItem {
                    message: reminder_message(title, bin.bin_types.join(", "), subtype, &reference_id)
                        .with_data("collection_date", bin.collection_date.to_string()),
                    reference_id,
                    entity_ids: vec![bin.id],
                    recipients: Recipients::Household { actor: None },
                    subtype,
                    dedupe_within_hours: None,
                }
            })
            .collect())
    }

    async fn claim(&self, item: &DueItem, at: Timestamp) -> Result<bool, sqlx::Error> {
        match item.entity_ids.first() {
            Some(id) => self.store.claim_bin(*id, self.run, at).await,
            None => Ok(false),
        }
    }

    async fn release(&self, item: &DueItem, at: Timestamp) -> Result<(), sqlx::Error> {
        if let Some(id) = item.entity_ids.first() {
            self.store.release_bin(*id, self.run, at).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chores
// ---------------------------------------------------------------------------

/// Uncompleted chores due today.
pub struct ChoreReminders {
    store: Arc<dyn HouseholdStore>,
}

impl ChoreReminders {
    pub fn new(store: Arc<dyn HouseholdStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReminderCategory for ChoreReminders {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::Chores
    }

    fn run_type(&self) -> String {
        "due".to_string()
    }

    async fn due_items(&self, now: Timestamp) -> Result<Vec<DueItem>, SchedulerError> {
        let subtype = Subtype::ChoreDue;
        let chores = self.store.chores_due(now.date_naive()).await?;
        Ok(chores
            .into_iter()
            .map(|chore| {
                let reference_id = format!("chore-{}-{}", chore.id, chore.due_date);
                let recipients = match chore.assignee_id {
                    Some(assignee) => Recipients::Owner(assignee),
                    None => Recipients::Household { actor: None },
                };
                DueItem {
                    message: reminder_message("Chore due today", &chore.title, subtype, &reference_id)
                        .with_data("chore_id", chore.id),
                    reference_id,
                    entity_ids: vec![chore.id],
                    recipients,
                    subtype,
                    dedupe_within_hours: None,
                }
            })
            .collect())
    }

    async fn claim(&self, item: &DueItem, at: Timestamp) -> Result<bool, sqlx::Error> {
        match item.entity_ids.first() {
            Some(id) => self.store.claim_chore(*id, at).await,
            None => Ok(false),
        }
    }

    async fn release(&self, item: &DueItem, at: Timestamp) -> Result<(), sqlx::Error> {
        if let Some(id) = item.entity_ids.first() {
            self.store.release_chore(*id, at).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shopping
// ---------------------------------------------------------------------------

/// Unannounced shopping items, one broadcast per member who added them.
pub struct ShoppingAnnouncements {
    store: Arc<dyn HouseholdStore>,
}

impl ShoppingAnnouncements {
    pub fn new(store: Arc<dyn HouseholdStore>) -> Self {
        Self { store }
    }
}

fn shopping_body(items: &[ShoppingItem]) -> String {
    let names: Vec<&str> = items
        .iter()
        .take(SHOPPING_PREVIEW)
        .map(|i| i.name.as_str())
        .collect();
    let listed = names.join(", ");
    match items.len() {
        1 => format!("{listed} was added to the list"),
        n if n <= SHOPPING_PREVIEW => format!("{listed} were added to the list"),
        n => format!("{listed} and {} more were added to the list", n - SHOPPING_PREVIEW),
    }
}

#[async_trait]
impl ReminderCategory for ShoppingAnnouncements {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::Shopping
    }

    fn run_type(&self) -> String {
        "added".to_string()
    }

    async fn due_items(&self, _now: Timestamp) -> Result<Vec<DueItem>, SchedulerError> {
        let subtype = Subtype::ShoppingAdded;
        let mut by_adder: BTreeMap<OwnerId, Vec<ShoppingItem>> = BTreeMap::new();
        for item in self.store.unannounced_items().await? {
            by_adder.entry(item.added_by).or_default().push(item);
        }

        Ok(by_adder
            .into_iter()
            .map(|(adder, items)| {
                let ids: Vec<_> = items.iter().map(|i| i.id).collect();
                let reference_id = format!(
                    "shopping-{}",
                    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join("-")
                );
                DueItem {
                    message: reminder_message("Shopping list", shopping_body(&items), subtype, &reference_id)
                        .with_data("item_count", items.len()),
                    reference_id,
                    entity_ids: ids,
                    recipients: Recipients::Household { actor: Some(adder) },
                    subtype,
                    dedupe_within_hours: None,
                }
            })
            .collect())
    }

    /// Succeeds if at least one item was still unannounced.
    async fn claim(&self, item: &DueItem, at: Timestamp) -> Result<bool, sqlx::Error> {
        let claimed = self.store.claim_items(&item.entity_ids, at).await?;
        Ok(!claimed.is_empty())
    }

    async fn release(&self, item: &DueItem, at: Timestamp) -> Result<(), sqlx::Error> {
        self.store.release_items(&item.entity_ids, at).await?;
        Ok(())
    }
}
