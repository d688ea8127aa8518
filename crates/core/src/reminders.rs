//! Reminder lead times and their tolerant minute windows.
//!
//! The trigger runs periodically, not continuously, so each lead time is a
//! minute range rather than an exact offset: an entity is due for a lead
//! time when its start falls inside `[now + min, now + max]`.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::categories::Subtype;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// MinuteWindow
// ---------------------------------------------------------------------------

/// An inclusive range of minutes from "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteWindow {
    pub min_minutes: i64,
    pub max_minutes: i64,
}

impl MinuteWindow {
    pub const fn new(min_minutes: i64, max_minutes: i64) -> Self {
        Self {
            min_minutes,
            max_minutes,
        }
    }

    /// Absolute `(start, end)` bounds of the window relative to `now`.
    pub fn bounds(&self, now: Timestamp) -> (Timestamp, Timestamp) {
        (
            now + Duration::minutes(self.min_minutes),
            now + Duration::minutes(self.max_minutes),
        )
    }

    pub fn contains(&self, now: Timestamp, at: Timestamp) -> bool {
        let (start, end) = self.bounds(now);
        at >= start && at <= end
    }
}

/// Window for F1 session reminders ("about an hour before").
pub const F1_SESSION_WINDOW: MinuteWindow = MinuteWindow::new(55, 65);

// ---------------------------------------------------------------------------
// LeadTime
// ---------------------------------------------------------------------------

/// Supported calendar reminder lead times, one marker column each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadTime {
    #[serde(rename = "15m")]
    Minutes15,
    #[serde(rename = "30m")]
    Minutes30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "1d")]
    Day1,
}

impl LeadTime {
    pub const ALL: [LeadTime; 4] = [
        LeadTime::Minutes15,
        LeadTime::Minutes30,
        LeadTime::Hour1,
        LeadTime::Day1,
    ];

    pub fn window(self) -> MinuteWindow {
        match self {
            LeadTime::Minutes15 => MinuteWindow::new(14, 20),
            LeadTime::Minutes30 => MinuteWindow::new(29, 35),
            LeadTime::Hour1 => MinuteWindow::new(59, 70),
            LeadTime::Day1 => MinuteWindow::new(1380, 1500),
        }
    }

    pub fn subtype(self) -> Subtype {
        match self {
            LeadTime::Minutes15 => Subtype::CalendarReminder15m,
            LeadTime::Minutes30 => Subtype::CalendarReminder30m,
            LeadTime::Hour1 => Subtype::CalendarReminder1h,
            LeadTime::Day1 => Subtype::CalendarReminder1d,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadTime::Minutes15 => "15m",
            LeadTime::Minutes30 => "30m",
            LeadTime::Hour1 => "1h",
            LeadTime::Day1 => "1d",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == value)
    }

    /// Human phrase used in reminder bodies.
    pub fn phrase(self) -> &'static str {
        match self {
            LeadTime::Minutes15 => "in 15 minutes",
            LeadTime::Minutes30 => "in 30 minutes",
            LeadTime::Hour1 => "in 1 hour",
            LeadTime::Day1 => "tomorrow",
        }
    }
}

// ---------------------------------------------------------------------------
// BinRun
// ---------------------------------------------------------------------------

/// The two daily bin reminder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinRun {
    /// The evening before collection ("put the bins out tonight").
    Evening,
    /// The morning of collection.
    Morning,
}

impl BinRun {
    pub fn as_str(self) -> &'static str {
        match self {
            BinRun::Evening => "evening",
            BinRun::Morning => "morning",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "evening" => Some(BinRun::Evening),
            "morning" => Some(BinRun::Morning),
            _ => None,
        }
    }

    /// Wall-clock default: mornings before noon, evenings after.
    pub fn for_time(now: Timestamp) -> Self {
        use chrono::Timelike;
        if now.hour() < 12 {
            BinRun::Morning
        } else {
            BinRun::Evening
        }
    }

    pub fn subtype(self) -> Subtype {
        match self {
            BinRun::Evening => Subtype::BinsEvening,
            BinRun::Morning => Subtype::BinsMorning,
        }
    }
}
