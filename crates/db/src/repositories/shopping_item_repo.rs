//! Repository for announcement queries over `shopping_items`.

use hearth_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::household::ShoppingItem;

const COLUMNS: &str = "id, name, added_by, created_at, announced_at";

pub struct ShoppingItemRepo;

impl ShoppingItemRepo {
    /// Items nobody has been told about yet, oldest first.
    pub async fn unannounced(pool: &PgPool) -> Result<Vec<ShoppingItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM shopping_items \
             WHERE announced_at IS NULL \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ShoppingItem>(&query).fetch_all(pool).await
    }

    /// Mark the given items announced; returns the ids this call claimed.
    pub async fn claim(
        pool: &PgPool,
        ids: &[DbId],
        at: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE shopping_items SET announced_at = $2 \
             WHERE id = ANY($1) AND announced_at IS NULL \
             RETURNING id",
        )
        .bind(ids)
        .bind(at)
        .fetch_all(pool)
        .await
    }

    pub async fn release(pool: &PgPool, ids: &[DbId], at: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE shopping_items SET announced_at = NULL \
             WHERE id = ANY($1) AND announced_at = $2",
        )
        .bind(ids)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
