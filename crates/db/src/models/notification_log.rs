//! Notification ledger models.

use hearth_core::types::{DbId, OwnerId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Column list for `notification_log` queries.
pub const LEDGER_COLUMNS: &str = "id, owner_id, category, notification_type, reference_id, \
     title, body, payload, status, created_at";

/// Dispatch status of a ledger entry.
///
/// Entries start as `sent` or `failed` and only move forward:
/// `sent -> read -> dismissed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Sent,
    Failed,
    Read,
    Dismissed,
}

impl LedgerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Sent => "sent",
            LedgerStatus::Failed => "failed",
            LedgerStatus::Read => "read",
            LedgerStatus::Dismissed => "dismissed",
        }
    }

    /// Statuses an entry may be in to move to `self`.
    pub fn allowed_from(self) -> &'static [LedgerStatus] {
        match self {
            LedgerStatus::Read => &[LedgerStatus::Sent, LedgerStatus::Failed],
            LedgerStatus::Dismissed => {
                &[LedgerStatus::Sent, LedgerStatus::Failed, LedgerStatus::Read]
            }
            LedgerStatus::Sent | LedgerStatus::Failed => &[],
        }
    }
}

/// A row from the `notification_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: DbId,
    pub owner_id: OwnerId,
    pub category: String,
    pub notification_type: String,
    pub reference_id: Option<String>,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub created_at: Timestamp,
}

/// DTO for appending to the ledger.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub owner_id: OwnerId,
    pub category: String,
    pub notification_type: String,
    pub reference_id: Option<String>,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub status: LedgerStatus,
    pub created_at: Timestamp,
}

/// Lookup key for the best-effort duplicate guard.
#[derive(Debug, Clone)]
pub struct DedupeQuery<'a> {
    pub owner_id: OwnerId,
    pub category: &'a str,
    pub notification_type: &'a str,
    pub reference_id: &'a str,
    pub since: Timestamp,
}
