pub mod device_token;
pub mod household;
pub mod integration;
pub mod notification_log;
pub mod preference;
