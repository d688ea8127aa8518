//! Formula 1 season schedule from the Jolpica (Ergast-compatible) API.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use hearth_core::clock::Clock;
use hearth_core::types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::cache::{Cached, FetchCache};
use crate::fetch::{FetchError, HttpFetcher};

pub const DEFAULT_SCHEDULE_URL: &str = "https://api.jolpi.ca/ergast/f1/current.json";

const CACHE_KEY: &str = "f1:schedule:current";

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Practice1,
    Practice2,
    Practice3,
    SprintQualifying,
    Sprint,
    Qualifying,
    Race,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Practice1 => "fp1",
            SessionKind::Practice2 => "fp2",
            SessionKind::Practice3 => "fp3",
            SessionKind::SprintQualifying => "sprint_qualifying",
            SessionKind::Sprint => "sprint",
            SessionKind::Qualifying => "qualifying",
            SessionKind::Race => "race",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionKind::Practice1 => "Practice 1",
            SessionKind::Practice2 => "Practice 2",
            SessionKind::Practice3 => "Practice 3",
            SessionKind::SprintQualifying => "Sprint Qualifying",
            SessionKind::Sprint => "Sprint",
            SessionKind::Qualifying => "Qualifying",
            SessionKind::Race => "Race",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub kind: SessionKind,
    pub starts_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Race {
    pub season: String,
    pub round: u32,
    pub name: String,
    pub circuit: String,
    pub locality: Option<String>,
    pub country: Option<String>,
    /// Sessions with a published start time, in chronological order.
    pub sessions: Vec<Session>,
}

/// A session together with the race weekend it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingSession {
    pub race: Race,
    pub session: Session,
}

impl UpcomingSession {
    /// Stable identifier used as the ledger reference.
    pub fn reference_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.race.season,
            self.race.round,
            self.session.kind.as_str()
        )
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

#[derive(Deserialize)]
struct MrData {
    #[serde(rename = "RaceTable")]
    race_table: RaceTable,
}

#[derive(Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<WireRace>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRace {
    season: String,
    round: String,
    race_name: String,
    #[serde(rename = "Circuit")]
    circuit: WireCircuit,
    date: String,
    time: Option<String>,
    #[serde(rename = "FirstPractice")]
    first_practice: Option<WireSession>,
    #[serde(rename = "SecondPractice")]
    second_practice: Option<WireSession>,
    #[serde(rename = "ThirdPractice")]
    third_practice: Option<WireSession>,
    #[serde(rename = "SprintQualifying", alias = "SprintShootout")]
    sprint_qualifying: Option<WireSession>,
    #[serde(rename = "Sprint")]
    sprint: Option<WireSession>,
    #[serde(rename = "Qualifying")]
    qualifying: Option<WireSession>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCircuit {
    circuit_name: String,
    #[serde(rename = "Location")]
    location: Option<WireLocation>,
}

#[derive(Deserialize)]
struct WireLocation {
    locality: Option<String>,
    country: Option<String>,
}

#[derive(Deserialize)]
struct WireSession {
    date: String,
    time: Option<String>,
}

/// `None` for sessions without a published time ("TBC").
fn session_start(date: &str, time: Option<&str>) -> Option<Timestamp> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time?.trim_end_matches('Z'), "%H:%M:%S").ok()?;
    Some(date.and_time(time).and_utc())
}

/// Parse a `current.json` payload.
pub fn parse_schedule(body: &str) -> Result<Vec<Race>, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let races = envelope
        .mr_data
        .race_table
        .races
        .into_iter()
        .filter_map(|race| {
            let round = race.round.parse().ok()?;
            let candidates = [
                (SessionKind::Practice1, race.first_practice.as_ref()),
                (SessionKind::Practice2, race.second_practice.as_ref()),
                (SessionKind::Practice3, race.third_practice.as_ref()),
                (SessionKind::SprintQualifying, race.sprint_qualifying.as_ref()),
                (SessionKind::Sprint, race.sprint.as_ref()),
                (SessionKind::Qualifying, race.qualifying.as_ref()),
            ];
            let mut sessions: Vec<Session> = candidates
                .into_iter()
                .filter_map(|(kind, wire)| {
                    let wire = wire?;
                    Some(Session {
                        kind,
                        starts_at: session_start(&wire.date, wire.time.as_deref())?,
                    })
                })
                .collect();
            if let Some(starts_at) = session_start(&race.date, race.time.as_deref()) {
                sessions.push(Session {
                    kind: SessionKind::Race,
                    starts_at,
                });
            }
            sessions.sort_by_key(|s| s.starts_at);

            let (locality, country) = match race.circuit.location {
                Some(loc) => (loc.locality, loc.country),
                None => (None, None),
            };
            Some(Race {
                season: race.season,
                round,
                name: race.race_name,
                circuit: race.circuit.circuit_name,
                locality,
                country,
                sessions,
            })
        })
        .collect();

    Ok(races)
}

// ---------------------------------------------------------------------------
// F1ScheduleSource
// ---------------------------------------------------------------------------

pub struct F1ScheduleSource {
    fetcher: Arc<HttpFetcher>,
    cache: FetchCache<Vec<Race>>,
    url: String,
    ttl: chrono::Duration,
}

impl F1ScheduleSource {
    pub fn new(
        fetcher: Arc<HttpFetcher>,
        clock: Arc<dyn Clock>,
        url: impl Into<String>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            fetcher,
            cache: FetchCache::new(clock),
            url: url.into(),
            ttl,
        }
    }

    /// The current season, cached for the configured TTL.
    pub async fn schedule(&self) -> Result<Cached<Vec<Race>>, FetchError> {
        self.cache
            .get_or_fetch(CACHE_KEY, self.ttl, || async {
                let max_attempts = self.fetcher.policy().max_attempts;
                let response = self.fetcher.fetch_with_retry(&self.url, max_attempts).await?;
                parse_schedule(&response.body)
            })
            .await
    }

    /// Sessions starting in `[start, end]`, soonest first.
    ///
    /// A schedule that cannot be fetched and was never cached yields no
    /// sessions.
    pub async fn sessions_between(&self, start: Timestamp, end: Timestamp) -> Vec<UpcomingSession> {
        let races = match self.schedule().await {
            Ok(cached) => cached.value,
            Err(e) => {
                tracing::warn!(error = %e, "F1 schedule unavailable");
                return Vec::new();
            }
        };

        let mut upcoming: Vec<UpcomingSession> = races
            .iter()
            .flat_map(|race| {
                race.sessions
                    .iter()
                    .filter(|s| s.starts_at >= start && s.starts_at <= end)
                    .map(|s| UpcomingSession {
                        race: race.clone(),
                        session: s.clone(),
                    })
            })
            .collect();
        upcoming.sort_by_key(|u| u.session.starts_at);
        upcoming
    }
}
