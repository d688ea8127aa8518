//! Hearth notification engine.
//!
//! - [`vault`]: OAuth integrations with encrypted tokens and on-demand
//!   refresh ([`CredentialVault`]).
//! - [`fetch`] / [`cache`]: retrying HTTP fetcher and the stale-on-error
//!   TTL cache behind the [`sources`] (F1 schedule, news feeds).
//! - [`push`]: APNs signing, single-device delivery and per-owner fan-out
//!   ([`PushDispatcher`]).
//! - [`scheduler`]: the generic [`ReminderScheduler`] and its category
//!   descriptors, plus the [`Triggers`] entry point used by the cron routes.
//! - [`ledger`]: append-only [`NotificationLedger`] and the member inbox.

pub mod cache;
pub mod fetch;
pub mod ledger;
pub mod push;
pub mod retry;
pub mod scheduler;
pub mod sources;
pub mod vault;

pub use cache::{Cached, FetchCache, SourceTtls};
pub use fetch::{FetchError, HttpFetcher};
pub use ledger::NotificationLedger;
pub use push::{ApnsConfig, ApnsGateway, DeliveryOutcome, PushDispatcher, PushMessage, SendSummary};
pub use retry::RetryPolicy;
pub use scheduler::{ReminderScheduler, RunSummary, SchedulerError, TriggerReport, Triggers};
pub use vault::CredentialVault;
