//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the household member from a JWT Bearer token.
//! - [`auth::CronAuth`] -- Requires the shared cron secret.

pub mod auth;
