//! Reminderable household entities: calendar events, bin collections,
//! chores and shopping items. Each carries nullable "sent" markers.

use chrono::NaiveDate;
use hearth_core::reminders::{BinRun, LeadTime};
use hearth_core::types::{DbId, OwnerId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Column list for `calendar_events` queries.
pub const CALENDAR_EVENT_COLUMNS: &str = "id, owner_id, title, location, starts_at, all_day, \
     reminder_15m_sent_at, reminder_30m_sent_at, reminder_1h_sent_at, reminder_1d_sent_at";

/// A row from the `calendar_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CalendarEvent {
    pub id: DbId,
    pub owner_id: OwnerId,
    pub title: String,
    pub location: Option<String>,
    pub starts_at: Timestamp,
    pub all_day: bool,
    pub reminder_15m_sent_at: Option<Timestamp>,
    pub reminder_30m_sent_at: Option<Timestamp>,
    pub reminder_1h_sent_at: Option<Timestamp>,
    pub reminder_1d_sent_at: Option<Timestamp>,
}

impl CalendarEvent {
    pub fn marker(&self, lead: LeadTime) -> Option<Timestamp> {
        match lead {
            LeadTime::Minutes15 => self.reminder_15m_sent_at,
            LeadTime::Minutes30 => self.reminder_30m_sent_at,
            LeadTime::Hour1 => self.reminder_1h_sent_at,
            LeadTime::Day1 => self.reminder_1d_sent_at,
        }
    }

    pub fn marker_mut(&mut self, lead: LeadTime) -> &mut Option<Timestamp> {
        match lead {
            LeadTime::Minutes15 => &mut self.reminder_15m_sent_at,
            LeadTime::Minutes30 => &mut self.reminder_30m_sent_at,
            LeadTime::Hour1 => &mut self.reminder_1h_sent_at,
            LeadTime::Day1 => &mut self.reminder_1d_sent_at,
        }
    }
}

/// Marker column for a lead time.
pub fn lead_time_column(lead: LeadTime) -> &'static str {
    match lead {
        LeadTime::Minutes15 => "reminder_15m_sent_at",
        LeadTime::Minutes30 => "reminder_30m_sent_at",
        LeadTime::Hour1 => "reminder_1h_sent_at",
        LeadTime::Day1 => "reminder_1d_sent_at",
    }
}

/// A row from the `bin_collections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BinCollection {
    pub id: DbId,
    pub collection_date: NaiveDate,
    pub bin_types: Vec<String>,
    pub evening_reminder_sent_at: Option<Timestamp>,
    pub morning_reminder_sent_at: Option<Timestamp>,
}

impl BinCollection {
    pub fn marker(&self, run: BinRun) -> Option<Timestamp> {
        match run {
            BinRun::Evening => self.evening_reminder_sent_at,
            BinRun::Morning => self.morning_reminder_sent_at,
        }
    }

    pub fn marker_mut(&mut self, run: BinRun) -> &mut Option<Timestamp> {
        match run {
            BinRun::Evening => &mut self.evening_reminder_sent_at,
            BinRun::Morning => &mut self.morning_reminder_sent_at,
        }
    }
}

/// Marker column for a bin run.
pub fn bin_run_column(run: BinRun) -> &'static str {
    match run {
        BinRun::Evening => "evening_reminder_sent_at",
        BinRun::Morning => "morning_reminder_sent_at",
    }
}

/// A row from the `chores` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Chore {
    pub id: DbId,
    pub title: String,
    pub assignee_id: Option<OwnerId>,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub reminder_sent_at: Option<Timestamp>,
}

/// A row from the `shopping_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShoppingItem {
    pub id: DbId,
    pub name: String,
    pub added_by: OwnerId,
    pub created_at: Timestamp,
    pub announced_at: Option<Timestamp>,
}
