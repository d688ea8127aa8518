//! Repository for reminder queries over `bin_collections`.

use chrono::NaiveDate;
use hearth_core::reminders::BinRun;
use hearth_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::household::{bin_run_column, BinCollection};

const COLUMNS: &str =
    "id, collection_date, bin_types, evening_reminder_sent_at, morning_reminder_sent_at";

pub struct BinCollectionRepo;

impl BinCollectionRepo {
    /// Collections on `date` whose marker for `run` is still null.
    pub async fn due_on(
        pool: &PgPool,
        date: NaiveDate,
        run: BinRun,
    ) -> Result<Vec<BinCollection>, sqlx::Error> {
        let marker = bin_run_column(run);
        let query = format!(
            "SELECT {COLUMNS} FROM bin_collections \
             WHERE collection_date = $1 AND {marker} IS NULL \
             ORDER BY id"
        );
        sqlx::query_as::<_, BinCollection>(&query)
            .bind(date)
            .fetch_all(pool)
            .await
    }

    pub async fn claim(
        pool: &PgPool,
        id: DbId,
        run: BinRun,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let marker = bin_run_column(run);
        let query = format!(
            "UPDATE bin_collections SET {marker} = $2 WHERE id = $1 AND {marker} IS NULL"
        );
        let result = sqlx::query(&query).bind(id).bind(at).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn release(
        pool: &PgPool,
        id: DbId,
        run: BinRun,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let marker = bin_run_column(run);
        let query =
            format!("UPDATE bin_collections SET {marker} = NULL WHERE id = $1 AND {marker} = $2");
        let result = sqlx::query(&query).bind(id).bind(at).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
