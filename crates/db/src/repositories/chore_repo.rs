//! Repository for reminder queries over `chores`.

use chrono::NaiveDate;
use hearth_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::household::Chore;

const COLUMNS: &str = "id, title, assignee_id, due_date, completed, reminder_sent_at";

pub struct ChoreRepo;

impl ChoreRepo {
    /// Open chores due on `date` that have not been reminded yet.
    pub async fn due_on(pool: &PgPool, date: NaiveDate) -> Result<Vec<Chore>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chores \
             WHERE due_date = $1 AND NOT completed AND reminder_sent_at IS NULL \
             ORDER BY id"
        );
        sqlx::query_as::<_, Chore>(&query)
            .bind(date)
            .fetch_all(pool)
            .await
    }

    pub async fn claim(pool: &PgPool, id: DbId, at: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chores SET reminder_sent_at = $2 WHERE id = $1 AND reminder_sent_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn release(pool: &PgPool, id: DbId, at: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chores SET reminder_sent_at = NULL WHERE id = $1 AND reminder_sent_at = $2",
        )
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
