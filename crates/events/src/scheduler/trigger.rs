//! Map a trigger request (category plus optional run type) onto descriptor
//! runs and fold their summaries into one report.

use std::sync::Arc;

use hearth_core::categories::NotificationCategory;
use hearth_core::reminders::{BinRun, LeadTime};
use serde::Serialize;

use super::calendar::CalendarReminders;
use super::f1::{F1News, F1Sessions};
use super::household::{BinReminders, ChoreReminders, ShoppingAnnouncements};
use super::{ReminderCategory, ReminderScheduler, RunSummary, SchedulerError};
use crate::sources::f1::F1ScheduleSource;
use crate::sources::news::NewsSource;

/// Response body of a trigger endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerReport {
    pub message: String,
    /// Items claimed across all runs.
    pub count: usize,
    pub attempted: usize,
    pub sent: usize,
    pub skipped: usize,
    /// Items left for the next run because preferences could not be read.
    pub deferred: usize,
    pub run_type: String,
    /// Run types that errored while the others completed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

impl TriggerReport {
    fn from_runs(category: NotificationCategory, runs: &[RunSummary], failed: Vec<String>) -> Self {
        let run_type = runs
            .iter()
            .map(|r| r.run_type.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let count: usize = runs.iter().map(|r| r.items).sum();
        Self {
            message: format!("Processed {count} {category} reminder(s)"),
            count,
            attempted: runs.iter().map(|r| r.attempted).sum(),
            sent: runs.iter().map(|r| r.sent).sum(),
            skipped: runs.iter().map(|r| r.skipped).sum(),
            deferred: runs.iter().map(|r| r.deferred).sum(),
            run_type,
            failed,
        }
    }
}

fn boxed(descriptor: impl ReminderCategory + 'static) -> Box<dyn ReminderCategory> {
    Box::new(descriptor)
}

/// Entry point for the cron-driven trigger endpoints.
pub struct Triggers {
    scheduler: Arc<ReminderScheduler>,
    schedule: Arc<F1ScheduleSource>,
    news: Arc<NewsSource>,
}

impl Triggers {
    pub fn new(
        scheduler: Arc<ReminderScheduler>,
        schedule: Arc<F1ScheduleSource>,
        news: Arc<NewsSource>,
    ) -> Self {
        Self {
            scheduler,
            schedule,
            news,
        }
    }

    pub fn scheduler(&self) -> &Arc<ReminderScheduler> {
        &self.scheduler
    }

    /// Run `category` now.
    ///
    /// `run_type` selects a lead time (`15m`, `30m`, `1h`, `1d`) for
    /// calendar, `evening`/`morning` for bins and `sessions`/`news` for F1.
    /// When absent: every lead time, the bin run for the current hour, and
    /// F1 sessions.
    ///
    /// The run type is validated before the push configuration is checked.
    pub async fn run(
        &self,
        category: NotificationCategory,
        run_type: Option<&str>,
    ) -> Result<TriggerReport, SchedulerError> {
        let descriptors = self.descriptors(category, run_type)?;
        if !self.scheduler.is_push_configured() {
            return Err(SchedulerError::PushNotConfigured);
        }
        self.run_descriptors(category, &descriptors).await
    }

    /// A failing descriptor does not stop the rest. The call fails only
    /// when every descriptor failed.
    async fn run_descriptors(
        &self,
        category: NotificationCategory,
        descriptors: &[Box<dyn ReminderCategory>],
    ) -> Result<TriggerReport, SchedulerError> {
        let mut runs = Vec::with_capacity(descriptors.len());
        let mut failed = Vec::new();
        let mut first_error = None;
        for descriptor in descriptors {
            match self.scheduler.run(descriptor.as_ref()).await {
                Ok(summary) => runs.push(summary),
                Err(e) => {
                    let run_type = descriptor.run_type();
                    tracing::error!(category = %category, run_type = %run_type, error = %e, "Reminder run failed");
                    failed.push(run_type);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if runs.is_empty() => Err(e),
            _ => Ok(TriggerReport::from_runs(category, &runs, failed)),
        }
    }

    fn descriptors(
        &self,
        category: NotificationCategory,
        run_type: Option<&str>,
    ) -> Result<Vec<Box<dyn ReminderCategory>>, SchedulerError> {
        let stores = self.scheduler.stores();
        let invalid = |value: &str| SchedulerError::InvalidRunType {
            category,
            value: value.to_string(),
        };

        let descriptors: Vec<Box<dyn ReminderCategory>> = match category {
            NotificationCategory::Calendar => {
                let leads = match run_type {
                    Some(value) => vec![LeadTime::parse(value).ok_or_else(|| invalid(value))?],
                    None => LeadTime::ALL.to_vec(),
                };
                leads
                    .into_iter()
                    .map(|lead| boxed(CalendarReminders::new(stores.calendar.clone(), lead)))
                    .collect()
            }
            NotificationCategory::Bins => {
                let run = match run_type {
                    Some(value) => BinRun::parse(value).ok_or_else(|| invalid(value))?,
                    None => BinRun::for_time(self.scheduler.clock().now()),
                };
                vec![boxed(BinReminders::new(stores.household.clone(), run))]
            }
            NotificationCategory::Chores => match run_type {
                None | Some("due") => vec![boxed(ChoreReminders::new(stores.household.clone()))],
                Some(value) => return Err(invalid(value)),
            },
            NotificationCategory::Shopping => match run_type {
                None | Some("added") => {
                    vec![boxed(ShoppingAnnouncements::new(stores.household.clone()))]
                }
                Some(value) => return Err(invalid(value)),
            },
            NotificationCategory::F1 => match run_type {
                None | Some("sessions") => vec![boxed(F1Sessions::new(self.schedule.clone()))],
                Some("news") => vec![boxed(F1News::new(self.news.clone()))],
                Some(value) => return Err(invalid(value)),
            },
        };
        Ok(descriptors)
    }
}
