//! End-to-end cycle scenarios over mocked upstreams.
//!
//! Each test drives the orchestrator against a wiremock server and
//! inspects the published artifacts, exercising the bot contract the
//! engine guarantees to polling clients.

use std::fs;

use camino::Utf8PathBuf;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use diffdelta::config::FleetConfig;
use diffdelta::engine::{FeedDocument, SourceStatus};
use diffdelta::orchestrator::{CycleReport, Orchestrator};
use diffdelta::utils::paths::OutputLayout;

const RSS_TWO_ITEMS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Demo Feed</title>
    <link>https://example.com</link>
    <item>
      <guid>post-a</guid>
      <title>Alpha ships</title>
      <link>https://example.com/alpha</link>
      <description>Alpha is out.</description>
      <pubDate>Mon, 01 Jun 2026 08:00:00 GMT</pubDate>
    </item>
    <item>
      <guid>post-b</guid>
      <title>Beta lands</title>
      <link>https://example.com/beta</link>
      <description>Beta follows.</description>
      <pubDate>Tue, 02 Jun 2026 08:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

fn layout_of(dir: &TempDir) -> OutputLayout {
    OutputLayout::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
}

fn rss_config(server_uri: &str) -> FleetConfig {
    let config = json!({
        "sources": {
            "rss_demo": {
                "enabled": true,
                "adapter": "rss",
                "config": {"feed_url": server_uri, "ttl_sec": 60},
                "paths": {"latest": "diff/source/rss_demo/latest.json"}
            }
        }
    });
    FleetConfig::from_str_named(&config.to_string(), "test").unwrap()
}

fn json_config(source: &str, server_uri: &str) -> FleetConfig {
    let config = json!({
        "sources": {
            source: {
                "enabled": true,
                "adapter": "json",
                "config": {"api_url": server_uri, "ttl_sec": 60},
                "paths": {"latest": format!("diff/source/{source}/latest.json")}
            }
        }
    });
    FleetConfig::from_str_named(&config.to_string(), "test").unwrap()
}

async fn serve_string(server: &MockServer, status: u16, body: &str) {
    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

async fn serve_json(server: &MockServer, status: u16, body: serde_json::Value) {
    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn run_cycle(dir: &TempDir, config: &FleetConfig) -> CycleReport {
    let orchestrator = Orchestrator::new(config.clone(), layout_of(dir)).unwrap();
    orchestrator.run_cycle().await.unwrap()
}

fn read_feed(dir: &TempDir, rel: &str) -> FeedDocument {
    let content = fs::read_to_string(dir.path().join(rel)).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn first_cycle_emits_both_items_as_new() {
    let server = MockServer::start().await;
    serve_string(&server, 200, RSS_TWO_ITEMS).await;

    let dir = TempDir::new().unwrap();
    let config = rss_config(&server.uri());
    let report = run_cycle(&dir, &config).await;

    assert!(report.global_changed);
    assert!(!report.has_errors());
    assert_eq!(report.new, 2);

    let feed = read_feed(&dir, "diff/source/rss_demo/latest.json");
    assert!(feed.changed);
    assert!(feed.prev_cursor.is_zero());
    assert!(feed.cursor.as_str().starts_with("sha256:"));
    assert_ne!(feed.cursor, feed.prev_cursor);
    assert_eq!(feed.buckets.new.len(), 2);
    // Adapter order preserved inside the bucket.
    assert_eq!(feed.buckets.new[0].id, "post-a");
    assert_eq!(feed.buckets.new[1].id, "post-b");
    assert_eq!(
        feed.buckets.new[0].provenance.evidence_urls,
        ["https://example.com/alpha"]
    );

    let global = read_feed(&dir, "diff/latest.json");
    assert!(global.changed);
    assert_eq!(global.sources_included, ["rss_demo"]);
    assert_eq!(global.buckets.new.len(), 2);
    assert!(global.sources["rss_demo"].changed);

    // Fleet state records the hash and cursor for the next cycle.
    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("diff/_state.json")).unwrap())
            .unwrap();
    assert!(state["rss_demo"]["last_hash"].is_string());
    assert_eq!(state["rss_demo"]["last_cursor"], feed.cursor.as_str());
    assert!(state["_global"]["last_cursor"].is_string());
}

#[tokio::test]
async fn identical_second_cycle_preserves_cursor_and_skips_global_write() {
    let server = MockServer::start().await;
    serve_string(&server, 200, RSS_TWO_ITEMS).await;

    let dir = TempDir::new().unwrap();
    let config = rss_config(&server.uri());

    let first_report = run_cycle(&dir, &config).await;
    assert!(first_report.global_changed);
    let first_feed = read_feed(&dir, "diff/source/rss_demo/latest.json");
    let first_text = fs::read_to_string(dir.path().join("diff/source/rss_demo/latest.json")).unwrap();

    // Remove the global feed so a rewrite would be visible.
    fs::remove_file(dir.path().join("diff/latest.json")).unwrap();

    let second_report = run_cycle(&dir, &config).await;
    assert!(!second_report.global_changed);

    // Global feed not rewritten on an unchanged cycle.
    assert!(!dir.path().join("diff/latest.json").exists());

    // Per-source feed rewritten, byte-equal except generated_at.
    let second_feed = read_feed(&dir, "diff/source/rss_demo/latest.json");
    assert!(!second_feed.changed);
    assert_eq!(second_feed.cursor, first_feed.cursor);
    assert_eq!(second_feed.cursor, second_feed.prev_cursor);
    assert!(second_feed.buckets.is_empty());
    assert_eq!(second_feed.batch_narrative, "rss_demo: No changes detected.");

    let second_text =
        fs::read_to_string(dir.path().join("diff/source/rss_demo/latest.json")).unwrap();
    // The documents differ: buckets drained, changed flipped.
    assert_ne!(first_text, second_text);
}

#[tokio::test]
async fn third_cycle_with_identical_content_is_byte_stable_except_timestamp() {
    let server = MockServer::start().await;
    serve_string(&server, 200, RSS_TWO_ITEMS).await;

    let dir = TempDir::new().unwrap();
    let config = rss_config(&server.uri());

    run_cycle(&dir, &config).await; // changed
    run_cycle(&dir, &config).await; // unchanged baseline
    let second = fs::read_to_string(dir.path().join("diff/source/rss_demo/latest.json")).unwrap();
    let second_feed = read_feed(&dir, "diff/source/rss_demo/latest.json");

    run_cycle(&dir, &config).await; // unchanged again
    let third = fs::read_to_string(dir.path().join("diff/source/rss_demo/latest.json")).unwrap();
    let third_feed = read_feed(&dir, "diff/source/rss_demo/latest.json");

    // Idempotence: identical upstream + identical prior state give
    // byte-identical documents modulo generated_at.
    assert_eq!(
        second.replace(&second_feed.generated_at, "GENERATED_AT"),
        third.replace(&third_feed.generated_at, "GENERATED_AT")
    );
}

#[tokio::test]
async fn whitespace_only_title_change_is_not_a_change() {
    let server = MockServer::start().await;
    serve_json(
        &server,
        200,
        json!([{"id": "a", "title": "Alpha", "url": "https://x/a", "content": "body"}]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = json_config("json_demo", &server.uri());

    let first = run_cycle(&dir, &config).await;
    assert!(first.global_changed);
    let first_feed = read_feed(&dir, "diff/source/json_demo/latest.json");

    // Upstream adds a trailing space to the title.
    serve_json(
        &server,
        200,
        json!([{"id": "a", "title": "Alpha ", "url": "https://x/a", "content": "body"}]),
    )
    .await;

    let second = run_cycle(&dir, &config).await;
    assert!(!second.global_changed);

    let second_feed = read_feed(&dir, "diff/source/json_demo/latest.json");
    assert!(!second_feed.changed);
    assert_eq!(second_feed.cursor, first_feed.cursor);
    assert_eq!(second_feed.cursor, second_feed.prev_cursor);
    assert!(second_feed.buckets.is_empty());
}

#[tokio::test]
async fn upstream_503_preserves_cursor_and_reports_issue() {
    let server = MockServer::start().await;
    serve_json(
        &server,
        200,
        json!([{"id": "a", "title": "Alpha", "url": "https://x/a", "content": "body"}]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = json_config("json_demo", &server.uri());

    let first = run_cycle(&dir, &config).await;
    assert!(!first.has_errors());
    let healthy_feed = read_feed(&dir, "diff/source/json_demo/latest.json");

    serve_string(&server, 503, "service unavailable").await;

    let second = run_cycle(&dir, &config).await;
    assert!(second.has_errors());
    assert_eq!(second.error_count, 1);
    assert!(!second.global_changed);

    let error_feed = read_feed(&dir, "diff/source/json_demo/latest.json");
    assert_eq!(error_feed.sources["json_demo"].status, SourceStatus::Error);
    assert!(!error_feed.changed);
    assert_eq!(error_feed.cursor, healthy_feed.cursor);
    assert_eq!(error_feed.cursor, error_feed.prev_cursor);
    assert!(error_feed.batch_narrative.contains("Error"));
    assert!(error_feed.buckets.is_empty());

    let issues: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("known_issues.json")).unwrap())
            .unwrap();
    let issue_list = issues["issues"].as_array().unwrap();
    assert_eq!(issue_list.len(), 1);
    assert_eq!(issue_list[0]["issue_key"], "json_demo_fetch_failed");
    assert_eq!(issue_list[0]["scope"]["ref"], "json_demo");

    // State keeps the last good hash; only the error fields move.
    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("diff/_state.json")).unwrap())
            .unwrap();
    assert!(state["json_demo"]["last_hash"].is_string());
    assert_eq!(state["json_demo"]["last_error"], "HTTP 503");
}

#[tokio::test]
async fn item_without_title_and_url_is_quarantined() {
    let server = MockServer::start().await;
    serve_json(&server, 200, json!([{"id": "x1", "content": "payload only"}])).await;

    let dir = TempDir::new().unwrap();
    let config = json_config("json_demo", &server.uri());
    let report = run_cycle(&dir, &config).await;

    assert!(report.global_changed);
    assert_eq!(report.flagged, 1);
    assert_eq!(report.new, 0);

    let feed = read_feed(&dir, "diff/source/json_demo/latest.json");
    assert!(feed.buckets.new.is_empty());
    assert_eq!(feed.buckets.flagged.len(), 1);

    let flagged = &feed.buckets.flagged[0];
    assert_eq!(flagged.risk.reasons, ["missing_title", "missing_url"]);
    assert!(flagged.risk.score >= 0.4);
    assert!(flagged.risk.score <= 1.0);

    assert!(feed.batch_narrative.contains("1 flagged"));
}

#[tokio::test]
async fn two_sources_one_changed_one_stable() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;
    serve_json(
        &server_a,
        200,
        json!([{"id": "a1", "title": "A one", "url": "https://a/1", "content": "first"}]),
    )
    .await;
    serve_json(
        &server_b,
        200,
        json!([{"id": "b1", "title": "B one", "url": "https://b/1", "content": "stable"}]),
    )
    .await;

    let config = FleetConfig::from_str_named(
        &json!({
            "sources": {
                "alpha": {
                    "enabled": true,
                    "adapter": "json",
                    "config": {"api_url": server_a.uri(), "ttl_sec": 60},
                    "paths": {"latest": "diff/source/alpha/latest.json"}
                },
                "beta": {
                    "enabled": true,
                    "adapter": "json",
                    "config": {"api_url": server_b.uri(), "ttl_sec": 60},
                    "paths": {"latest": "diff/source/beta/latest.json"}
                }
            }
        })
        .to_string(),
        "test",
    )
    .unwrap();

    let dir = TempDir::new().unwrap();
    run_cycle(&dir, &config).await;
    let beta_first = read_feed(&dir, "diff/source/beta/latest.json");

    // Alpha gains an item; beta stays byte-identical.
    serve_json(
        &server_a,
        200,
        json!([
            {"id": "a1", "title": "A one", "url": "https://a/1", "content": "first"},
            {"id": "a2", "title": "A two", "url": "https://a/2", "content": "second"}
        ]),
    )
    .await;

    fs::remove_file(dir.path().join("diff/latest.json")).unwrap();
    let report = run_cycle(&dir, &config).await;

    assert!(report.global_changed);
    assert!(dir.path().join("diff/latest.json").exists());

    let alpha = read_feed(&dir, "diff/source/alpha/latest.json");
    let beta = read_feed(&dir, "diff/source/beta/latest.json");
    assert!(alpha.changed);
    assert_ne!(alpha.cursor, alpha.prev_cursor);
    assert!(!beta.changed);
    assert_eq!(beta.cursor, beta_first.cursor);

    let global = read_feed(&dir, "diff/latest.json");
    assert_eq!(global.sources_included, ["alpha", "beta"]);
    assert!(global.sources["alpha"].changed);
    assert!(!global.sources["beta"].changed);
    assert_eq!(global.sources["beta"].cursor, beta_first.cursor);
    // Only the changed source contributes bucket items.
    assert!(global.buckets.new.iter().all(|i| i.source == "alpha"));
}

#[tokio::test]
async fn telemetry_records_cover_every_source() {
    let server = MockServer::start().await;
    serve_json(
        &server,
        200,
        json!([{"id": "a", "title": "Alpha", "url": "https://x/a", "content": "body"}]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = json_config("json_demo", &server.uri());
    run_cycle(&dir, &config).await;

    let telemetry: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("telemetry/latest.json")).unwrap())
            .unwrap();
    let records = telemetry["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["source"], "json_demo");
    assert_eq!(records[0]["fetch"]["ok"], true);
    assert_eq!(records[0]["fetch"]["status_code"], 200);
    assert_eq!(records[0]["fetch"]["items_fetched"], 1);
    assert_eq!(records[0]["emit"]["changed"], true);
    assert_eq!(records[0]["emit"]["new"], 1);
    assert_eq!(records[0]["run_id"], telemetry["run_id"]);
    assert!(records[0]["state"]["cursor"]
        .as_str()
        .unwrap()
        .starts_with("sha256:"));
}
