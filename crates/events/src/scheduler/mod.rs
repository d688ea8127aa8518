//! Generic reminder engine.
//!
//! [`ReminderScheduler::run`] drives one [`ReminderCategory`] descriptor
//! through the same pipeline for every category: collect due items,
//! resolve recipients, filter them by preferences and the ledger duplicate
//! guard, claim the item's marker, dispatch, record, and release the claim
//! when nothing was delivered.
//!
//! Descriptors live in the submodules; [`trigger`] maps a category plus an
//! optional run type onto the right descriptors.

pub mod calendar;
pub mod f1;
pub mod household;
pub mod trigger;

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::categories::{NotificationCategory, Subtype};
use hearth_core::clock::Clock;
use hearth_core::preferences::NotificationPreferences;
use hearth_core::types::{DbId, OwnerId, Timestamp};
use hearth_db::Stores;
use serde::Serialize;

use crate::ledger::{LedgerRecord, NotificationLedger};
use crate::push::{PushDispatcher, PushMessage};

pub use calendar::{CalendarChange, CalendarReminders, ChangeKind};
pub use f1::{F1News, F1Sessions};
pub use household::{BinReminders, ChoreReminders, ShoppingAnnouncements};
pub use trigger::{TriggerReport, Triggers};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Unknown run type '{value}' for {category}")]
    InvalidRunType {
        category: NotificationCategory,
        value: String,
    },

    #[error("Failed to load due items: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Push delivery is not configured")]
    PushNotConfigured,
}

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

/// Who a due item goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    Owner(OwnerId),
    /// Every member with a registered device. The actor, if any, is left
    /// out unless they opted into their own changes.
    Household { actor: Option<OwnerId> },
}

/// One notification the scheduler should send.
#[derive(Debug, Clone)]
pub struct DueItem {
    pub reference_id: String,
    /// Rows whose marker gates this item; empty for unmarked items.
    pub entity_ids: Vec<DbId>,
    pub recipients: Recipients,
    pub subtype: Subtype,
    pub message: PushMessage,
    /// Skip owners who got the same reference within this many hours.
    pub dedupe_within_hours: Option<i64>,
}

/// A family of reminders the engine knows how to run.
#[async_trait]
pub trait ReminderCategory: Send + Sync {
    fn category(&self) -> NotificationCategory;

    /// Label of this run, echoed in the trigger response.
    fn run_type(&self) -> String;

    async fn due_items(&self, now: Timestamp) -> Result<Vec<DueItem>, SchedulerError>;

    /// Set the item's marker if it is still null. Items without a marker
    /// always claim.
    async fn claim(&self, _item: &DueItem, _at: Timestamp) -> Result<bool, sqlx::Error> {
        Ok(true)
    }

    /// Clear a marker written by [`ReminderCategory::claim`] at `at`.
    async fn release(&self, _item: &DueItem, _at: Timestamp) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

/// Outcome of one scheduler run.
///
/// `items` counts claimed items and `attempted`/`sent` count per-owner
/// dispatches. `skipped` counts owners filtered out by preferences or the
/// duplicate guard, or with no registered device. `deferred` counts items
/// left unclaimed because a recipient's preferences could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub category: NotificationCategory,
    pub run_type: String,
    pub items: usize,
    pub attempted: usize,
    pub sent: usize,
    pub skipped: usize,
    pub deferred: usize,
}

// ---------------------------------------------------------------------------
// ReminderScheduler
// ---------------------------------------------------------------------------

pub struct ReminderScheduler {
    stores: Stores,
    dispatcher: Arc<PushDispatcher>,
    ledger: Arc<NotificationLedger>,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(
        stores: Stores,
        dispatcher: Arc<PushDispatcher>,
        ledger: Arc<NotificationLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            dispatcher,
            ledger,
            clock,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn ledger(&self) -> &Arc<NotificationLedger> {
        &self.ledger
    }

    pub fn is_push_configured(&self) -> bool {
        self.dispatcher.is_configured()
    }

    /// Run one descriptor to completion.
    ///
    /// Without a push gateway nothing is claimed and the run fails with
    /// [`SchedulerError::PushNotConfigured`]. Otherwise only a failure to
    /// list due items is an error; per-item and per-owner failures are
    /// logged and the run continues.
    pub async fn run(&self, descriptor: &dyn ReminderCategory) -> Result<RunSummary, SchedulerError> {
        if !self.is_push_configured() {
            return Err(SchedulerError::PushNotConfigured);
        }

        let now = self.clock.now();
        let category = descriptor.category();
        let items = descriptor.due_items(now).await?;

        let mut summary = RunSummary {
            category,
            run_type: descriptor.run_type(),
            items: 0,
            attempted: 0,
            sent: 0,
            skipped: 0,
            deferred: 0,
        };

        for item in &items {
            let recipients = match self.resolve(&item.recipients).await {
                Ok(recipients) => recipients,
                Err(e) => {
                    tracing::error!(
                        category = %category,
                        reference_id = %item.reference_id,
                        error = %e,
                        "Failed to resolve recipients"
                    );
                    continue;
                }
            };

            // Gates are evaluated before the claim so an unreadable
            // preference row leaves the marker untouched for the next run.
            let actor = match item.recipients {
                Recipients::Household { actor } => actor,
                Recipients::Owner(_) => None,
            };
            let mut targets = Vec::with_capacity(recipients.len());
            let mut gated = 0;
            let mut unknown = false;
            for owner_id in recipients {
                match self.gate(item, owner_id, actor).await {
                    Gate::Send => targets.push(owner_id),
                    Gate::Skip => gated += 1,
                    Gate::Unknown => unknown = true,
                }
            }
            if unknown {
                tracing::warn!(
                    category = %category,
                    reference_id = %item.reference_id,
                    "Preferences unavailable, deferring item to the next run"
                );
                summary.deferred += 1;
                continue;
            }

            match descriptor.claim(item, now).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(reference_id = %item.reference_id, "Item already claimed");
                    continue;
                }
                Err(e) => {
                    tracing::error!(reference_id = %item.reference_id, error = %e, "Failed to claim item");
                    continue;
                }
            }
            summary.items += 1;
            summary.skipped += gated;

            let mut attempted = 0;
            let mut sent = 0;
            for owner_id in targets {
                let result = self.dispatcher.send_to_owner(owner_id, &item.message).await;
                if result.total == 0 {
                    tracing::debug!(
                        owner_id = %owner_id,
                        reference_id = %item.reference_id,
                        "No registered devices"
                    );
                    summary.skipped += 1;
                    continue;
                }

                attempted += 1;
                let delivered = result.sent > 0;
                if delivered {
                    sent += 1;
                } else {
                    tracing::info!(
                        owner_id = %owner_id,
                        reference_id = %item.reference_id,
                        devices = result.total,
                        "No device received reminder"
                    );
                }

                self.ledger
                    .append(LedgerRecord {
                        owner_id,
                        subtype: item.subtype,
                        reference_id: Some(item.reference_id.clone()),
                        title: item.message.title.clone(),
                        body: item.message.body.clone(),
                        payload: serde_json::Value::Object(item.message.data.clone()),
                        delivered,
                    })
                    .await;
            }

            if attempted > 0 && sent == 0 {
                if let Err(e) = descriptor.release(item, now).await {
                    tracing::error!(reference_id = %item.reference_id, error = %e, "Failed to release claim");
                }
            }

            summary.attempted += attempted;
            summary.sent += sent;
        }

        tracing::info!(
            category = %category,
            run_type = %summary.run_type,
            items = summary.items,
            attempted = summary.attempted,
            sent = summary.sent,
            skipped = summary.skipped,
            deferred = summary.deferred,
            "Reminder run complete"
        );
        Ok(summary)
    }

    async fn resolve(&self, recipients: &Recipients) -> Result<Vec<OwnerId>, sqlx::Error> {
        match recipients {
            Recipients::Owner(owner_id) => Ok(vec![*owner_id]),
            Recipients::Household { .. } => self.stores.devices.household().await,
        }
    }

    /// Actor, preference and duplicate checks for one owner.
    async fn gate(&self, item: &DueItem, owner_id: OwnerId, actor: Option<OwnerId>) -> Gate {
        let prefs = match self.stores.preferences.preferences(owner_id).await {
            Ok(prefs) => prefs.unwrap_or_else(|| NotificationPreferences::defaults(owner_id)),
            Err(e) => {
                tracing::warn!(owner_id = %owner_id, error = %e, "Failed to load preferences");
                return Gate::Unknown;
            }
        };

        if actor == Some(owner_id) && !prefs.notify_own_changes {
            return Gate::Skip;
        }
        if !prefs.allows(item.subtype) {
            return Gate::Skip;
        }

        if let Some(hours) = item.dedupe_within_hours {
            let duplicate = self
                .ledger
                .was_already_sent(
                    owner_id,
                    item.subtype.category(),
                    item.subtype.as_str(),
                    &item.reference_id,
                    hours,
                )
                .await;
            if duplicate {
                tracing::debug!(owner_id = %owner_id, reference_id = %item.reference_id, "Already sent");
                return Gate::Skip;
            }
        }
        Gate::Send
    }
}

enum Gate {
    Send,
    Skip,
    /// Preferences could not be read.
    Unknown,
}

/// Message with the `type` and `reference_id` keys every reminder carries.
pub(crate) fn reminder_message(
    title: impl Into<String>,
    body: impl Into<String>,
    subtype: Subtype,
    reference_id: &str,
) -> PushMessage {
    PushMessage::new(title, body)
        .with_data("type", subtype.as_str())
        .with_data("reference_id", reference_id)
}
