//! PostgreSQL persistence for the notification backend.
//!
//! - [`models`]: row types and insert DTOs.
//! - [`repositories`]: `sqlx` queries, one repo struct per table.
//! - [`stores`]: the storage-boundary traits the delivery engine depends on,
//!   implemented for PostgreSQL by [`PgStore`].
//! - [`memory`]: an in-process [`MemoryStore`] with the same semantics, used
//!   by tests and local development without a database.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod stores;

pub use memory::MemoryStore;
pub use stores::{PgStore, Stores};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}

/// Apply embedded migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
