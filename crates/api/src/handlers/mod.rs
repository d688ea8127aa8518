pub mod devices;
pub mod f1;
pub mod integrations;
pub mod notifications;
pub mod triggers;
