//! Device push token models.

use hearth_core::categories::Platform;
use hearth_core::types::{DbId, OwnerId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `device_tokens` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceToken {
    pub id: DbId,
    pub owner_id: OwnerId,
    pub token: String,
    pub platform: String,
    pub registered_at: Timestamp,
}

impl DeviceToken {
    /// `None` for platform strings this build does not know about.
    pub fn platform(&self) -> Option<Platform> {
        Platform::parse(&self.platform)
    }
}
