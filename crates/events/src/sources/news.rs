//! F1 news merged from several RSS feeds.
//!
//! Each feed is cached independently. A feed that cannot be fetched or
//! parsed contributes nothing; the others still come through.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hearth_core::clock::Clock;
use hearth_core::hashing::fingerprint;
use hearth_core::types::Timestamp;
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::cache::FetchCache;
use crate::fetch::{FetchError, HttpFetcher};

/// Feeds polled when `F1_NEWS_FEEDS` is not set.
pub const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("formula1", "https://www.formula1.com/en/latest/all.xml"),
    ("autosport", "https://www.autosport.com/rss/f1/news/"),
    ("motorsport", "https://www.motorsport.com/rss/f1/news/"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsFeed {
    pub name: String,
    pub url: String,
}

impl NewsFeed {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Feeds from `F1_NEWS_FEEDS` (`name=url,name=url`), else the defaults.
    pub fn from_env() -> Vec<Self> {
        let configured: Vec<Self> = std::env::var("F1_NEWS_FEEDS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .filter_map(|pair| {
                        let (name, url) = pair.split_once('=')?;
                        Some(Self::new(name.trim(), url.trim()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if configured.is_empty() {
            DEFAULT_FEEDS
                .iter()
                .map(|(name, url)| Self::new(*name, *url))
                .collect()
        } else {
            configured
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub published_at: Option<Timestamp>,
    pub source: String,
}

impl Article {
    /// Short stable id derived from the link, used as the ledger reference.
    pub fn reference_id(&self) -> String {
        fingerprint(&self.link)
    }
}

/// Merged articles plus whether any feed was served from a stale cache.
#[derive(Debug, Clone, Serialize)]
pub struct NewsDigest {
    pub articles: Vec<Article>,
    pub stale: bool,
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    PubDate,
}

#[derive(Default)]
struct PendingItem {
    title: String,
    link: String,
    pub_date: String,
}

impl PendingItem {
    fn field(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
        }
    }

    fn into_article(self, source: &str) -> Option<Article> {
        let title = self.title.trim();
        let link = self.link.trim();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        Some(Article {
            title: title.to_string(),
            link: link.to_string(),
            published_at: DateTime::parse_from_rfc2822(self.pub_date.trim())
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            source: source.to_string(),
        })
    }
}

/// Unescaped text, or the raw bytes when an entity is unknown (`&nbsp;`).
fn text_value(e: &BytesText<'_>) -> String {
    match e.unescape() {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(e).into_owned(),
    }
}

/// Parse an RSS 2.0 document. Items without a title or link are skipped.
pub fn parse_rss(body: &str, source: &str) -> Result<Vec<Article>, FetchError> {
    let mut reader = Reader::from_reader(body.as_bytes());
    reader.trim_text(true);

    let mut buf: Vec<u8> = Vec::new();
    let mut is_feed = false;
    let mut item: Option<PendingItem> = None;
    let mut field: Option<Field> = None;
    let mut out = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"rss" | b"channel" => is_feed = true,
                b"item" => {
                    item = Some(PendingItem::default());
                    field = None;
                }
                b"title" if item.is_some() => field = Some(Field::Title),
                b"link" if item.is_some() => field = Some(Field::Link),
                b"pubDate" if item.is_some() => field = Some(Field::PubDate),
                _ => field = None,
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" => {
                    field = None;
                    if let Some(article) = item.take().and_then(|i| i.into_article(source)) {
                        out.push(article);
                    }
                }
                _ => field = None,
            },
            Ok(Event::Text(e)) => {
                if let (Some(pending), Some(f)) = (item.as_mut(), field) {
                    pending.field(f).push_str(&text_value(&e));
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(pending), Some(f)) = (item.as_mut(), field) {
                    pending.field(f).push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Parse(format!("{source}: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    if !is_feed {
        return Err(FetchError::Parse(format!("{source}: not an RSS document")));
    }
    Ok(out)
}

/// Newest first; undated articles last. Duplicate links keep the first seen.
pub fn merge_articles(feeds: Vec<Vec<Article>>) -> Vec<Article> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Article> = feeds
        .into_iter()
        .flatten()
        .filter(|a| seen.insert(a.link.clone()))
        .collect();
    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged
}

pub struct NewsSource {
    fetcher: Arc<HttpFetcher>,
    cache: FetchCache<Vec<Article>>,
    feeds: Vec<NewsFeed>,
    ttl: chrono::Duration,
}

impl NewsSource {
    pub fn new(
        fetcher: Arc<HttpFetcher>,
        clock: Arc<dyn Clock>,
        feeds: Vec<NewsFeed>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            fetcher,
            cache: FetchCache::new(clock),
            feeds,
            ttl,
        }
    }

    /// Up to `limit` newest articles across all feeds.
    pub async fn latest(&self, limit: usize) -> NewsDigest {
        let results = futures::future::join_all(self.feeds.iter().map(|feed| async move {
            let key = format!("news:{}", feed.url);
            let result = self
                .cache
                .get_or_fetch(&key, self.ttl, || async {
                    let max_attempts = self.fetcher.policy().max_attempts;
                    let response = self.fetcher.fetch_with_retry(&feed.url, max_attempts).await?;
                    parse_rss(&response.body, &feed.name)
                })
                .await;
            (feed, result)
        }))
        .await;

        let mut stale = false;
        let mut per_feed = Vec::with_capacity(results.len());
        for (feed, result) in results {
            match result {
                Ok(cached) => {
                    stale |= cached.stale;
                    per_feed.push(cached.value);
                }
                Err(e) => {
                    tracing::warn!(feed = %feed.name, error = %e, "News feed unavailable");
                }
            }
        }

        let mut articles = merge_articles(per_feed);
        articles.truncate(limit);
        NewsDigest { articles, stale }
    }
}
