//! Repository layer: one unit struct per table with associated async queries.

pub mod bin_collection_repo;
pub mod calendar_event_repo;
pub mod chore_repo;
pub mod device_token_repo;
pub mod integration_repo;
pub mod notification_log_repo;
pub mod notification_preference_repo;
pub mod shopping_item_repo;

pub use bin_collection_repo::BinCollectionRepo;
pub use calendar_event_repo::CalendarEventRepo;
pub use chore_repo::ChoreRepo;
pub use device_token_repo::DeviceTokenRepo;
pub use integration_repo::IntegrationRepo;
pub use notification_log_repo::NotificationLogRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;
pub use shopping_item_repo::ShoppingItemRepo;
