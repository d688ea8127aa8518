//! Read-only third-party data sources behind the fetch cache.

pub mod f1;
pub mod news;

pub use f1::{F1ScheduleSource, Race, Session, SessionKind, UpcomingSession};
pub use news::{Article, NewsDigest, NewsFeed, NewsSource};
