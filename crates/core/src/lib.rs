//! Shared domain vocabulary for the household notification backend.
//!
//! This crate has zero internal deps so it can be used by the storage
//! layer, the delivery engine, and the API server alike.

pub mod categories;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod hashing;
pub mod hex;
pub mod preferences;
pub mod providers;
pub mod reminders;
pub mod types;
