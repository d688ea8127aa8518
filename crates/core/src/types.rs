/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Household members are identified by the auth provider's user UUID.
pub type OwnerId = uuid::Uuid;
