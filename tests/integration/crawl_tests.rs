//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use seen::config::{build_parsers, SpiderConfig};
use seen::item::{FieldValue, Item, ItemSpec, SaveStep, Selector};
use seen::output::JsonLinesSink;
use seen::{Config, Parser, Spider};
use std::future;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Collects saved items for inspection
fn collecting_save() -> (SaveStep, Arc<Mutex<Vec<Item>>>) {
    let items = Arc::new(Mutex::new(Vec::new()));
    let sink = items.clone();
    let save = SaveStep::suspending(move |item, _session| {
        let sink = sink.clone();
        async move {
            sink.lock().unwrap().push(item);
            Ok(())
        }
    });
    (save, items)
}

async fn mount_page(server: &MockServer, page: &str, body: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_with_items() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title> Home </title></head><body>
        <a href="/page1">Page 1</a>
        <a href='page2'>Page 2</a>
        </body></html>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        "<html><head><title>First</title></head><body><p>one</p></body></html>",
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/page2",
        "<html><head><title>Second</title></head><body><p>two</p></body></html>",
        1,
    )
    .await;

    let (save, items) = collecting_save();
    let spec = ItemSpec::new("page", save).field("title", Selector::css("title").unwrap());

    let summary = Spider::new(SpiderConfig::with_roots([format!("{}/", base_url)]))
        .parser(Parser::with_item(spec))
        .crawl_with_shutdown(future::pending())
        .await
        .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);

    let mut titles: Vec<String> = items
        .lock()
        .unwrap()
        .iter()
        .filter_map(|item| item.get("title").and_then(FieldValue::as_text).map(String::from))
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["First", "Home", "Second"]);
}

#[tokio::test]
async fn test_dedup_fetches_each_url_once() {
    let mock_server = MockServer::start().await;

    // Every page links back to every other page
    let links = r#"<a href="/">home</a><a href="/a">a</a><a href="/b">b</a>"#;
    mount_page(&mock_server, "/", links, 1).await;
    mount_page(&mock_server, "/a", links, 1).await;
    mount_page(&mock_server, "/b", links, 1).await;

    // A single worker makes the dequeue order deterministic
    let mut config = SpiderConfig::with_roots([format!("{}/", mock_server.uri())]);
    config.concurrency = 1;

    let summary = Spider::new(config)
        .crawl_with_shutdown(future::pending())
        .await
        .unwrap();

    assert_eq!(summary.processed, 3);
}

#[tokio::test]
async fn test_host_filter_skips_other_hosts() {
    let allowed = MockServer::start().await;
    let other = MockServer::start().await;

    mount_page(
        &allowed,
        "/",
        &format!(r#"<a href="{}/elsewhere">out</a><a href="/inside">in</a>"#, other.uri()),
        1,
    )
    .await;
    mount_page(&allowed, "/inside", "leaf", 1).await;
    mount_page(&other, "/elsewhere", "never", 0).await;

    let mut config = SpiderConfig::with_roots([format!("{}/", allowed.uri())]);
    let host = url::Url::parse(&allowed.uri()).unwrap();
    config.url_limit.insert(format!(
        "{}:{}",
        host.host_str().unwrap(),
        host.port().unwrap()
    ));

    let summary = Spider::new(config)
        .crawl_with_shutdown(future::pending())
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_retry_exhaustion() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let url = format!("{}/slow", mock_server.uri());
    let mut config = SpiderConfig::with_roots([url.as_str()]);
    config.max_tries = 4;
    config.timeout = 0.05;

    let handler_calls = Arc::new(AtomicUsize::new(0));
    let calls = handler_calls.clone();

    let summary = Spider::new(config)
        .on_url_failed(move |failed| {
            assert_eq!(failed.attempts, 4);
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .crawl_with_shutdown(future::pending())
        .await
        .unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_urls, vec![url]);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_join_waits_for_spawned_urls() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", r#"<a href="/child">child</a>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("leaf")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = Spider::new(SpiderConfig::with_roots([format!(
        "{}/",
        mock_server.uri()
    )]))
    .crawl_with_shutdown(future::pending())
    .await
    .unwrap();

    // The crawl only returns once the slow child was processed too
    assert_eq!(summary.processed, 2);
    assert!(!summary.interrupted);
}

#[tokio::test]
async fn test_save_failure_does_not_stop_crawl() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<title>root</title><a href="/next">next</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/next", "<title>next</title>", 1).await;

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let save = SaveStep::blocking(move |_item, _session| {
        counter.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("disk full")
    });
    let spec = ItemSpec::new("page", save).field("title", Selector::css("title").unwrap());

    let summary = Spider::new(SpiderConfig::with_roots([format!(
        "{}/",
        mock_server.uri()
    )]))
    .parser(Parser::with_item(spec))
    .crawl_with_shutdown(future::pending())
    .await
    .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_panicking_save_does_not_hang_crawl() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<title>root</title><a href="/a">a</a><a href="/b">b</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/a", "<title>a</title>", 1).await;
    mount_page(&mock_server, "/b", "<title>b</title>", 1).await;

    let save = SaveStep::blocking(|item, _session| panic!("cannot store {}", item.url()));
    let spec = ItemSpec::new("page", save).field("title", Selector::css("title").unwrap());

    let mut config = SpiderConfig::with_roots([format!("{}/", mock_server.uri())]);
    config.concurrency = 2;

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        Spider::new(config)
            .parser(Parser::with_item(spec))
            .crawl_with_shutdown(future::pending()),
    )
    .await
    .expect("crawl did not finish")
    .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_declared_charset_is_used_for_items() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            b"<html><head><title>caf\xe9</title></head></html>".to_vec(),
            "text/html; charset=iso-8859-1",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (save, items) = collecting_save();
    let spec = ItemSpec::new("page", save).field("title", Selector::css("title").unwrap());

    Spider::new(SpiderConfig::with_roots([format!(
        "{}/latin1",
        mock_server.uri()
    )]))
    .parser(Parser::with_item(spec))
    .crawl_with_shutdown(future::pending())
    .await
    .unwrap();

    let items = items.lock().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].get("title"),
        Some(&FieldValue::Text("caf\u{e9}".to_string()))
    );
}

#[tokio::test]
async fn test_json_mode() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"id": 7, "next": "/api?page=2"}"#)
                .insert_header("content-type", "application/json"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (save, items) = collecting_save();
    let parser = Parser::with_item(ItemSpec::new("api", save)).json();

    let summary = Spider::new(SpiderConfig::with_roots([format!(
        "{}/api",
        mock_server.uri()
    )]))
    .parser(parser)
    .crawl_with_shutdown(future::pending())
    .await
    .unwrap();

    assert_eq!(summary.processed, 1);

    let items = items.lock().unwrap();
    assert_eq!(items.len(), 1);
    let json = items[0].get("json").and_then(FieldValue::as_json).unwrap();
    assert_eq!(json["id"], 7);
}

#[tokio::test]
async fn test_malformed_json_saves_nothing() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/api", "<html>not json</html>", 1).await;

    let (save, items) = collecting_save();
    let parser = Parser::with_item(ItemSpec::new("api", save)).json();

    let summary = Spider::new(SpiderConfig::with_roots([format!(
        "{}/api",
        mock_server.uri()
    )]))
    .parser(parser)
    .crawl_with_shutdown(future::pending())
    .await
    .unwrap();

    // The fetch itself succeeded; only the item was rejected
    assert_eq!(summary.processed, 1);
    assert!(items.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_binary_item_skips_url_discovery() {
    let mock_server = MockServer::start().await;
    let body = r#"<a href="/hidden">looks like a link</a>"#;
    mount_page(&mock_server, "/file.bin", body, 1).await;
    mount_page(&mock_server, "/hidden", "never", 0).await;

    let (save, items) = collecting_save();
    let parser = Parser::with_item(ItemSpec::binary("file", save));

    let summary = Spider::new(SpiderConfig::with_roots([format!(
        "{}/file.bin",
        mock_server.uri()
    )]))
    .parser(parser)
    .crawl_with_shutdown(future::pending())
    .await
    .unwrap();

    assert_eq!(summary.processed, 1);
    let items = items.lock().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content.as_deref(), Some(body.as_bytes()));
}

#[tokio::test]
async fn test_configured_crawl_writes_json_lines() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<title>Index</title><a href="/topic/1">t1</a><a href="/about">about</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/topic/1",
        r#"<title>Topic One</title><img src="/a.png"><span>id=42</span>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/about", "<title>About</title>", 1).await;

    let temp_dir = TempDir::new().unwrap();
    let items_path = temp_dir.path().join("items.jsonl");

    let toml = format!(
        r#"
[spider]
roots = "{root}/"
concurrency = 2

[output]
items-path = "{items}"

[[parser]]
contains = "Topic"

[parser.item]
name = "topic"

[parser.item.fields]
title = {{ css = "title" }}
img = {{ css = "img", attr = "src" }}
id = {{ regex = "id=(\\d+)" }}
"#,
        root = mock_server.uri(),
        items = items_path.display()
    );

    let config = Config::from_str(&toml).unwrap();
    let sink = Arc::new(JsonLinesSink::open(&items_path).unwrap());
    let parsers = build_parsers(&config.parsers, &sink.save_step()).unwrap();

    let summary = Spider::new(config.spider)
        .parsers(parsers)
        .crawl_with_shutdown(future::pending())
        .await
        .unwrap();

    assert_eq!(summary.processed, 3);

    let contents = std::fs::read_to_string(&items_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);

    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["name"], "topic");
    assert_eq!(record["url"], format!("{}/topic/1", mock_server.uri()));
    assert_eq!(record["fields"]["title"], "Topic One");
    assert_eq!(record["fields"]["img"], serde_json::json!(["/a.png"]));
    assert_eq!(record["fields"]["id"], serde_json::json!(["42"]));
}
