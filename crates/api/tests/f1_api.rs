//! Integration tests for the public `/api/v1/f1` endpoints.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{body_json, TestApp};
use hearth_api::state::EngineSettings;
use hearth_events::sources::news::NewsFeed;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn schedule_body() -> serde_json::Value {
    json!({
        "MRData": { "RaceTable": { "season": "2026", "Races": [{
            "season": "2026",
            "round": "3",
            "raceName": "Japanese Grand Prix",
            "Circuit": {
                "circuitName": "Suzuka Circuit",
                "Location": { "locality": "Suzuka", "country": "Japan" }
            },
            "date": "2026-03-29",
            "time": "05:00:00Z",
            "Qualifying": { "date": "2026-03-28", "time": "06:00:00Z" }
        }]}}
    })
}

const FEED: &str = r#"<?xml version="1.0"?><rss><channel>
    <item><title>Rookie tops second practice</title><link>https://news.test/fp2</link>
    <pubDate>Fri, 13 Mar 2026 16:00:00 GMT</pubDate></item>
    <item><title>Upgrade package arrives early</title><link>https://news.test/upgrade</link>
    <pubDate>Thu, 12 Mar 2026 09:00:00 GMT</pubDate></item>
    </channel></rss>"#;

fn app_with_sources(server: &MockServer) -> TestApp {
    TestApp::new(EngineSettings {
        schedule_url: format!("{}/current.json", server.uri()),
        news_feeds: vec![NewsFeed::new("Paddock", format!("{}/feed.xml", server.uri()))],
        ..common::offline_settings()
    })
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[tokio::test]
async fn schedule_is_served_fresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schedule_body()))
        .expect(1)
        .mount(&server)
        .await;
    let app = app_with_sources(&server);

    let response = app.get("/api/v1/f1/schedule", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["stale"], false);
    assert_eq!(json["data"][0]["name"], "Japanese Grand Prix");
    assert_eq!(json["data"][0]["round"], 3);
    assert_eq!(json["data"][0]["sessions"][0]["kind"], "qualifying");
    assert_eq!(json["data"][0]["sessions"][1]["kind"], "race");

    // A second request inside the TTL is served from the cache.
    let cached = app.get("/api/v1/f1/schedule", None).await;
    assert_eq!(cached.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_schedule_falls_back_to_stale_copy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schedule_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let app = app_with_sources(&server);

    let first = body_json(app.get("/api/v1/f1/schedule", None).await).await;
    assert_eq!(first["stale"], false);

    app.clock.advance(Duration::hours(7));

    let response = app.get("/api/v1/f1/schedule", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["stale"], true);
    assert_eq!(json["data"][0]["name"], "Japanese Grand Prix");
}

#[tokio::test]
async fn unreachable_schedule_without_cache_is_502() {
    let app = TestApp::offline();

    let response = app.get("/api/v1/f1/schedule", None).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UPSTREAM_UNAVAILABLE");
    assert!(!json["error"].as_str().unwrap().contains("127.0.0.1"));
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[tokio::test]
async fn news_lists_articles_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;
    let app = app_with_sources(&server);

    let response = app.get("/api/v1/f1/news", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["stale"], false);
    let articles = json["data"].as_array().unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0]["title"], "Rookie tops second practice");
    assert_eq!(articles[0]["source"], "Paddock");
}

#[tokio::test]
async fn news_limit_is_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;
    let app = app_with_sources(&server);

    let json = body_json(app.get("/api/v1/f1/news?limit=1", None).await).await;

    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn news_without_reachable_feeds_is_empty() {
    let app = TestApp::offline();

    let response = app.get("/api/v1/f1/news", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}
