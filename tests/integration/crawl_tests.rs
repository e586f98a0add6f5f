//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run whole chains end-to-end,
//! plus an in-memory fetcher that records how many downloads run at once.

use async_trait::async_trait;
use crawl_chain::config::parse_config;
use crawl_chain::crawler::{crawl, Crawler, CrawlerOptions, Fetch};
use crawl_chain::{FetchError, FromValue, JobError, ResultKind, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Mounts an index linking to three articles, two of which have a heading
async fn mount_site(server: &MockServer) {
    mount_page(
        server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <a href="/article/1">First</a>
            <a href="article/2">Second</a>
            <a href="/article/3">Third</a>
        </body></html>"#,
    )
    .await;
    mount_page(server, "/article/1", "<html><body><h1>Rust</h1></body></html>").await;
    mount_page(server, "/article/2", "<html><body><h1>Tokio</h1></body></html>").await;
    mount_page(server, "/article/3", "<html><body><p>No heading</p></body></html>").await;
}

fn crawler<T: Clone + Send + 'static>() -> Crawler<T> {
    Crawler::new(CrawlerOptions::default()).expect("Failed to build crawler")
}

#[tokio::test]
async fn test_click_and_report_child_headings() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let crawler: Crawler<String> = crawler();
    crawler
        .start(format!("{}/", mock_server.uri()))
        .find("a")
        .click()
        .for_each_job(|page| {
            page.find("h1").text_content().report();
        });

    let mut results = crawler.results().await;
    results.sort();
    assert_eq!(results, vec!["Rust", "Tokio"]);
    assert!(crawler.failures().await.is_empty());
    assert_eq!(crawler.pending(), 0);
}

#[tokio::test]
async fn test_each_over_clicked_jobs() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let crawler: Crawler<String> = crawler();
    let index = crawler
        .start(format!("{}/", mock_server.uri()))
        .find("a")
        .click();

    let mut visited = Vec::new();
    index
        .each(|value| {
            let page = value.into_job().expect("click produces jobs");
            visited.push(page.url().to_string());
            page.find("h1").text_content().report();
        })
        .await
        .unwrap();

    assert_eq!(visited.len(), 3);
    assert!(visited[1].ends_with("/article/2"));

    let mut results = crawler.results().await;
    results.sort();
    assert_eq!(results, vec!["Rust", "Tokio"]);
}

#[derive(Debug, Clone, PartialEq)]
struct Summary {
    count: usize,
}

impl FromValue for Summary {
    fn from_value(value: Value<Self>) -> Option<Self> {
        value.into_custom()
    }
}

#[tokio::test]
async fn test_replace_into_custom_summary() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/list",
        "<ul><li>one</li><li>two</li><li>three</li></ul>",
    )
    .await;

    let crawler: Crawler<Summary> = crawler();
    let job = crawler
        .start(format!("{}/list", mock_server.uri()))
        .find("li")
        .text_content()
        .replace(|list| Value::Custom(Summary { count: list.len() }));

    job.result().await.unwrap();
    assert_eq!(job.kind(), ResultKind::Custom);
    assert_eq!(crawler.results().await, vec![Summary { count: 3 }]);
}

/// Fetcher that records the highest number of overlapping downloads
#[derive(Default)]
struct CountingFetcher {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl Fetch for CountingFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("<h1>{}</h1>", url))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_cap_bounds_downloads() {
    let fetcher = Arc::new(CountingFetcher::default());
    let crawler: Crawler<String> =
        Crawler::with_fetcher(CrawlerOptions::default().concurrency(2), fetcher.clone()).unwrap();

    for n in 0..5 {
        crawler
            .start(format!("https://example.test/{}", n))
            .find("h1")
            .text_content()
            .report();
    }

    let results = crawler.results().await;
    assert_eq!(results.len(), 5);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);

    let peak = fetcher.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak concurrency was {}", peak);
    assert!(peak >= 1);
}

#[tokio::test]
async fn test_steps_apply_in_order_with_resolve() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let crawler: Crawler<String> = crawler();
    let values = crawler
        .start(format!("{}/", base))
        .find("a")
        .attr("href")
        .resolve()
        .get()
        .await
        .unwrap();

    assert_eq!(
        values,
        vec![
            Value::Text(format!("{}/article/1", base)),
            Value::Text(format!("{}/article/2", base)),
            Value::Text(format!("{}/article/3", base)),
        ]
    );
}

#[tokio::test]
async fn test_get_is_idempotent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Once</h1>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawler: Crawler<String> = crawler();
    let job = crawler
        .start(format!("{}/", mock_server.uri()))
        .find("h1")
        .text_content();

    let first = job.get().await.unwrap();
    let second = job.get().await.unwrap();
    assert_eq!(first, vec![Value::from("Once")]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_state_error_surfaces_and_keeps_payload() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let crawler: Crawler<String> = crawler();
    let job = crawler
        .start(format!("{}/", mock_server.uri()))
        .find("a")
        .resolve();

    let err = job.wait().await.unwrap_err();
    assert!(matches!(
        err,
        JobError::State {
            operation: "resolve",
            found: ResultKind::Elements,
            ..
        }
    ));
    assert_eq!(job.kind(), ResultKind::Elements);
}

#[tokio::test]
async fn test_fetch_failure_reported_without_blocking_results() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let crawler: Crawler<String> = crawler();
    let missing = crawler
        .start(format!("{}/missing", mock_server.uri()))
        .find("h1")
        .text_content();
    missing.clone().report();
    crawler
        .start(format!("{}/article/1", mock_server.uri()))
        .find("h1")
        .text_content()
        .report();

    assert_eq!(crawler.results().await, vec!["Rust"]);

    let err = missing.get().await.unwrap_err();
    assert!(matches!(
        err,
        JobError::Fetch(FetchError::Status { status: 404, .. })
    ));

    let failures = crawler.failures().await;
    assert_eq!(failures.len(), 1);
    assert!(failures[0].url.ends_with("/missing"));
}

#[tokio::test]
async fn test_headers_sent_with_every_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/next">n</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Next</h1>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = CrawlerOptions::default().header("x-api-key", "secret");
    let crawler: Crawler<String> = Crawler::new(options).unwrap();
    crawler
        .start(format!("{}/", mock_server.uri()))
        .find("a")
        .click()
        .for_each_job(|page| {
            page.find("h1").text_content().report();
        });

    assert_eq!(crawler.results().await, vec!["Next"]);
    assert!(crawler.failures().await.is_empty());
}

#[tokio::test]
async fn test_click_spawns_one_job_per_resolvable_link() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<a href="/a">a</a><a href="/b">b</a><a href="http://[::1">broken</a><a>no href</a>"#,
    )
    .await;
    for route in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>leaf</p>"))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let crawler: Crawler<String> = crawler();
    let index = crawler.start(format!("{}/", mock_server.uri())).find("a").click();

    let children = index.get().await.unwrap();
    // The anchor without href resolves to the page itself
    assert_eq!(children.len(), 3);
    assert!(children.iter().all(|value| value.kind_name() == "job"));

    crawler.results().await;
}

#[tokio::test]
async fn test_recipe_crawl_end_to_end() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let config = parse_config(&format!(
        r#"
[crawler]
concurrency = 3

[headers]
user-agent = "crawl-chain-test"

[[start]]
url = "{}/"
steps = [{{ find = "a" }}, "click", {{ find = "h1" }}, "text-content", "trim"]
"#,
        mock_server.uri()
    ))
    .unwrap();

    let mut outcome = crawl(config).await.unwrap();
    outcome.results.sort();
    assert_eq!(outcome.results, vec!["Rust", "Tokio"]);
    assert!(outcome.failures.is_empty());
}
