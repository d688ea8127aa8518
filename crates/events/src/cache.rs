//! Process-local TTL cache with stale-on-error fallback.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::Duration;
use hearth_core::clock::Clock;
use hearth_core::types::Timestamp;
use serde::Serialize;

/// Default TTL for race schedules.
const DEFAULT_SCHEDULE_TTL_SECS: i64 = 6 * 3600;

/// Default TTL for news feeds.
const DEFAULT_NEWS_TTL_SECS: i64 = 15 * 60;

/// Per-source freshness tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTtls {
    pub schedule: Duration,
    pub news: Duration,
}

impl Default for SourceTtls {
    fn default() -> Self {
        Self {
            schedule: Duration::seconds(DEFAULT_SCHEDULE_TTL_SECS),
            news: Duration::seconds(DEFAULT_NEWS_TTL_SECS),
        }
    }
}

impl SourceTtls {
    /// | Variable                 | Default |
    /// |--------------------------|---------|
    /// | `F1_SCHEDULE_TTL_SECS`   | `21600` |
    /// | `F1_NEWS_TTL_SECS`       | `900`   |
    pub fn from_env() -> Self {
        let secs = |name: &str, default: i64| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        Self {
            schedule: Duration::seconds(secs("F1_SCHEDULE_TTL_SECS", DEFAULT_SCHEDULE_TTL_SECS)),
            news: Duration::seconds(secs("F1_NEWS_TTL_SECS", DEFAULT_NEWS_TTL_SECS)),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    payload: T,
    fetched_at: Timestamp,
}

/// A cache read, tagged with whether it came from a failed refresh.
#[derive(Debug, Clone, Serialize)]
pub struct Cached<T> {
    pub value: T,
    pub stale: bool,
    pub fetched_at: Timestamp,
}

/// Keyed cache shared by one data source.
///
/// Concurrent misses for the same key may both fetch; the last store wins.
pub struct FetchCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> FetchCache<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Return the cached value for `key` if younger than `ttl`, otherwise
    /// run `fetch`. A failed fetch falls back to any previous value, flagged
    /// stale; without one the error propagates.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Cached<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let now = self.clock.now();
        let previous = self.read(key);

        if let Some(entry) = &previous {
            if now - entry.fetched_at < ttl {
                return Ok(Cached {
                    value: entry.payload.clone(),
                    stale: false,
                    fetched_at: entry.fetched_at,
                });
            }
        }

        match fetch().await {
            Ok(payload) => {
                let fetched_at = self.clock.now();
                self.write(
                    key,
                    CacheEntry {
                        payload: payload.clone(),
                        fetched_at,
                    },
                );
                Ok(Cached {
                    value: payload,
                    stale: false,
                    fetched_at,
                })
            }
            Err(e) => match previous {
                Some(entry) => {
                    tracing::warn!(key, error = %e, "Refresh failed, serving stale cache entry");
                    Ok(Cached {
                        value: entry.payload,
                        stale: true,
                        fetched_at: entry.fetched_at,
                    })
                }
                None => Err(e),
            },
        }
    }

    pub fn invalidate(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key);
    }

    fn read(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entries
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, entry: CacheEntry<T>) {
        self.entries
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), entry);
    }
}
