//! Repository for the append-only `notification_log` table.

use hearth_core::types::{DbId, OwnerId};
use sqlx::PgPool;

use crate::models::notification_log::{
    DedupeQuery, LedgerEntry, LedgerStatus, NewLedgerEntry, LEDGER_COLUMNS,
};

pub struct NotificationLogRepo;

impl NotificationLogRepo {
    /// Append an entry, returning its id.
    pub async fn insert(pool: &PgPool, entry: &NewLedgerEntry) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notification_log (owner_id, category, notification_type, reference_id, \
                 title, body, payload, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(entry.owner_id)
        .bind(&entry.category)
        .bind(&entry.notification_type)
        .bind(&entry.reference_id)
        .bind(&entry.title)
        .bind(&entry.body)
        .bind(&entry.payload)
        .bind(entry.status.as_str())
        .bind(entry.created_at)
        .fetch_one(pool)
        .await
    }

    /// Whether a matching `sent` (or later) entry exists since `query.since`.
    pub async fn exists_since(pool: &PgPool, query: &DedupeQuery<'_>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM notification_log \
                 WHERE owner_id = $1 AND category = $2 AND notification_type = $3 \
                   AND reference_id = $4 AND created_at >= $5 AND status <> 'failed' \
             )",
        )
        .bind(query.owner_id)
        .bind(query.category)
        .bind(query.notification_type)
        .bind(query.reference_id)
        .bind(query.since)
        .fetch_one(pool)
        .await
    }

    /// A member's inbox, newest first. Dismissed entries are hidden.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: OwnerId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {LEDGER_COLUMNS} FROM notification_log \
             WHERE owner_id = $1 AND status <> 'dismissed' \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Move an entry forward to `to`. Returns `false` if the entry does not
    /// belong to the member or is not in an allowed prior status.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        owner_id: OwnerId,
        to: LedgerStatus,
    ) -> Result<bool, sqlx::Error> {
        let allowed: Vec<&str> = to.allowed_from().iter().map(|s| s.as_str()).collect();
        let result = sqlx::query(
            "UPDATE notification_log SET status = $3 \
             WHERE id = $1 AND owner_id = $2 AND status = ANY($4)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(to.as_str())
        .bind(&allowed)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
