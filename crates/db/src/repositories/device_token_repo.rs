//! Repository for the `device_tokens` table.

use hearth_core::categories::Platform;
use hearth_core::types::{OwnerId, Timestamp};
use sqlx::PgPool;

use crate::models::device_token::DeviceToken;

/// Column list for `device_tokens` queries.
const COLUMNS: &str = "id, owner_id, token, platform, registered_at";

pub struct DeviceTokenRepo;

impl DeviceTokenRepo {
    /// Register a device, refreshing `registered_at` when the pair already exists.
    pub async fn upsert(
        pool: &PgPool,
        owner_id: OwnerId,
        token: &str,
        platform: Platform,
        registered_at: Timestamp,
    ) -> Result<DeviceToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO device_tokens (owner_id, token, platform, registered_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (owner_id, token) \
             DO UPDATE SET platform = EXCLUDED.platform, registered_at = EXCLUDED.registered_at \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeviceToken>(&query)
            .bind(owner_id)
            .bind(token)
            .bind(platform.as_str())
            .bind(registered_at)
            .fetch_one(pool)
            .await
    }

    /// All devices of one member, newest first.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: OwnerId,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM device_tokens \
             WHERE owner_id = $1 \
             ORDER BY registered_at DESC, id DESC"
        );
        sqlx::query_as::<_, DeviceToken>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Every member with at least one registered device (the household).
    pub async fn list_owners(pool: &PgPool) -> Result<Vec<OwnerId>, sqlx::Error> {
        sqlx::query_scalar("SELECT DISTINCT owner_id FROM device_tokens ORDER BY owner_id")
            .fetch_all(pool)
            .await
    }

    /// Remove one device of one member. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, owner_id: OwnerId, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM device_tokens WHERE owner_id = $1 AND token = $2")
            .bind(owner_id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a token regardless of owner (gateway reported it dead).
    pub async fn delete_token(pool: &PgPool, token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM device_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Keep only the most recently registered device of a member.
    ///
    /// Returns the number of duplicates removed.
    pub async fn retain_newest(pool: &PgPool, owner_id: OwnerId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM device_tokens \
             WHERE owner_id = $1 AND id NOT IN ( \
                 SELECT id FROM device_tokens WHERE owner_id = $1 \
                 ORDER BY registered_at DESC, id DESC LIMIT 1 \
             )",
        )
        .bind(owner_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
