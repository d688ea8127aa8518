//! F1 descriptors backed by the cached schedule and news sources.
//!
//! Neither has a stored marker; the ledger duplicate guard stops repeats.
//! A source outage with nothing cached yields an empty run.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::categories::{NotificationCategory, Subtype};
use hearth_core::reminders::F1_SESSION_WINDOW;
use hearth_core::types::Timestamp;

use super::{reminder_message, DueItem, Recipients, ReminderCategory, SchedulerError};
use crate::sources::f1::F1ScheduleSource;
use crate::sources::news::NewsSource;

pub const SESSION_DEDUPE_HOURS: i64 = 24;
pub const NEWS_DEDUPE_HOURS: i64 = 72;

/// Articles considered per news run.
pub const NEWS_PER_RUN: usize = 3;

pub struct F1Sessions {
    source: Arc<F1ScheduleSource>,
}

impl F1Sessions {
    pub fn new(source: Arc<F1ScheduleSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ReminderCategory for F1Sessions {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::F1
    }

    fn run_type(&self) -> String {
        "sessions".to_string()
    }

    async fn due_items(&self, now: Timestamp) -> Result<Vec<DueItem>, SchedulerError> {
        let subtype = Subtype::F1Session;
        let (start, end) = F1_SESSION_WINDOW.bounds(now);
        let sessions = self.source.sessions_between(start, end).await;

        Ok(sessions
            .into_iter()
            .map(|upcoming| {
                let reference_id = upcoming.reference_id();
                let body = format!("{} starts in 1 hour", upcoming.session.kind.label());
                DueItem {
                    message: reminder_message(&upcoming.race.name, body, subtype, &reference_id)
                        .with_data("session", upcoming.session.kind.as_str())
                        .with_data("starts_at", upcoming.session.starts_at.to_rfc3339()),
                    reference_id,
                    entity_ids: Vec::new(),
                    recipients: Recipients::Household { actor: None },
                    subtype,
                    dedupe_within_hours: Some(SESSION_DEDUPE_HOURS),
                }
            })
            .collect())
    }
}

pub struct F1News {
    source: Arc<NewsSource>,
}

impl F1News {
    pub fn new(source: Arc<NewsSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ReminderCategory for F1News {
    fn category(&self) -> NotificationCategory {
        NotificationCategory::F1
    }

    fn run_type(&self) -> String {
        "news".to_string()
    }

    async fn due_items(&self, _now: Timestamp) -> Result<Vec<DueItem>, SchedulerError> {
        let subtype = Subtype::F1News;
        let digest = self.source.latest(NEWS_PER_RUN).await;

        Ok(digest
            .articles
            .into_iter()
            .map(|article| {
                let reference_id = article.reference_id();
                DueItem {
                    message: reminder_message(
                        format!("F1 news: {}", article.source),
                        &article.title,
                        subtype,
                        &reference_id,
                    )
                    .with_data("link", article.link.as_str()),
                    reference_id,
                    entity_ids: Vec::new(),
                    recipients: Recipients::Household { actor: None },
                    subtype,
                    dedupe_within_hours: Some(NEWS_DEDUPE_HOURS),
                }
            })
            .collect())
    }
}
