//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch -> extract -> store cycle end-to-end through the real HTTP client.

use holdings_harvest::config::{parse_config, Config};
use holdings_harvest::crawler::{run_crawl, FailureKind};
use holdings_harvest::output::{export_records, CrawlStatus};
use holdings_harvest::Record;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at `seed`
///
/// Retries are fast and the politeness interval is off so tests stay quick.
fn create_test_config(seed: &str) -> Config {
    let content = format!(
        r#"
[crawler]
max-concurrent-fetches = 4
request-timeout-ms = 5000
min-request-interval-ms = 0

[retry]
max-retries = 3
base-delay-ms = 10
max-delay-ms = 40

[user-agent]
crawler-name = "TestHarvest"
crawler-version = "1.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[site]
seed = "{}"

[output]
spreadsheet-path = "holdings.csv"
"#,
        seed
    );

    parse_config(&content).expect("test config should be valid")
}

/// Renders a listing page in the default extractor markup
fn listing(archive: &str, fonds: &[(&str, &str)], next: Option<&str>, links: &[&str]) -> String {
    let mut html = format!(
        "<html><head><title>{}</title></head><body><h1 class=\"archive-name\">{}</h1><table class=\"views-table\"><tbody>",
        archive, archive
    );
    for (number, title) in fonds {
        html.push_str(&format!(
            "<tr class=\"fond-item\"><td class=\"fond-number\">{}</td><td class=\"fond-title\">{}</td></tr>",
            number, title
        ));
    }
    html.push_str("</tbody></table>");
    for link in links {
        html.push_str(&format!("<p><a class=\"fond-link\" href=\"{}\">фонд</a></p>", link));
    }
    if let Some(next) = next {
        html.push_str(&format!(
            "<ul class=\"pager\"><li class=\"pager-next\"><a href=\"{}\">следующая ›</a></li></ul>",
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Renders page `n` of `total` with a Drupal-style numbered pager
fn numbered_listing(n: u32, total: u32) -> String {
    let mut pager = String::from("<ul class=\"pager\">");
    for i in 1..=total {
        if i == n {
            pager.push_str(&format!("<li class=\"pager-current\">{}</li>", i));
        } else {
            pager.push_str(&format!(
                "<li class=\"pager-item\"><a href=\"/fonds/{}\">{}</a></li>",
                i, i
            ));
        }
    }
    if n < total {
        pager.push_str(&format!(
            "<li class=\"pager-next\"><a href=\"/fonds/{}\">следующая ›</a></li>",
            n + 1
        ));
    }
    pager.push_str("</ul>");

    let number = n.to_string();
    listing("ГАРФ", &[(number.as_str(), "фонд")], None, &[])
        .replace("</body>", &format!("{}</body>", pager))
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page: &str, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

fn fond_numbers(records: &[Record]) -> Vec<&str> {
    records.iter().filter_map(Record::fond_number).collect()
}

#[tokio::test]
async fn test_full_crawl_with_pagination() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // The seed must carry the configured user agent
    Mock::given(method("GET"))
        .and(path("/state/list"))
        .and(header(
            "user-agent",
            "TestHarvest/1.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(html(listing(
            "ГАРФ",
            &[("Р-1", "Совет Министров"), ("Р-2", "Госплан")],
            Some("/state/list/2"),
            &[],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/state/list/2",
        listing("ГАРФ", &[("Р-3", "Наркомат  \n  юстиции")], None, &[]),
        1,
    )
    .await;

    let config = create_test_config(&format!("{}/state/list", base_url));
    let outcome = run_crawl(&config, CancellationToken::new())
        .await
        .expect("crawl should run");

    assert_eq!(fond_numbers(&outcome.records), vec!["Р-1", "Р-2", "Р-3"]);
    assert_eq!(outcome.records[2].title(), "Наркомат юстиции");
    assert_eq!(
        outcome.records[0].source_url().as_str(),
        format!("{}/state/list", base_url)
    );
    assert_eq!(
        outcome.records[2].source_url().as_str(),
        format!("{}/state/list/2", base_url)
    );

    let report = &outcome.report;
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.records_kept, 3);

    // Hand the result to the spreadsheet sink
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("holdings.csv");
    assert_eq!(export_records(&outcome.records, &out).unwrap(), 3);

    let written = std::fs::read_to_string(&out).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("archiveName,fondNumber,title,dateRange,description,sourceUrl")
    );
    assert_eq!(lines.count(), 3);
}

#[tokio::test]
async fn test_server_error_is_retried_then_reported() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/list",
        listing("ГАРФ", &[("1", "Первый")], None, &["/fond/2", "/fond/3"]),
        1,
    )
    .await;

    // 1 attempt + 3 retries
    Mock::given(method("GET"))
        .and(path("/fond/2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/fond/3",
        listing("ГАРФ", &[("3", "Третий")], None, &[]),
        1,
    )
    .await;

    let config = create_test_config(&format!("{}/list", base_url));
    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(fond_numbers(&outcome.records), vec!["1", "3"]);

    let report = &outcome.report;
    assert_eq!(report.status, CrawlStatus::CompletedWithFailures);
    assert_eq!(report.failed_pages.len(), 1);
    assert_eq!(report.failed_pages[0].url, format!("{}/fond/2", base_url));
    assert_eq!(report.failed_pages[0].kind, FailureKind::HttpError(500));
    assert_eq!(report.failed_pages[0].attempts, 4);
}

#[tokio::test]
async fn test_failed_pager_page_keeps_later_pages_reachable() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for page in [1, 3, 4, 5] {
        mount_page(
            &mock_server,
            &format!("/fonds/{}", page),
            numbered_listing(page, 5),
            1,
        )
        .await;
    }

    // Page 2 always fails: 1 attempt + 3 retries
    Mock::given(method("GET"))
        .and(path("/fonds/2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&format!("{}/fonds/1", base_url));
    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(fond_numbers(&outcome.records), vec!["1", "3", "4", "5"]);

    let report = &outcome.report;
    assert_eq!(report.status, CrawlStatus::CompletedWithFailures);
    assert_eq!(report.pages_processed, 4);
    assert_eq!(report.failed_pages.len(), 1);
    assert_eq!(report.failed_pages[0].url, format!("{}/fonds/2", base_url));
}

#[tokio::test]
async fn test_max_depth_stops_detail_chain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for depth in 0..=3 {
        let number = depth.to_string();
        let next = format!("/d{}", depth + 1);
        let expected = if depth <= 1 { 1 } else { 0 };
        mount_page(
            &mock_server,
            &format!("/d{}", depth),
            listing("ГАРФ", &[(number.as_str(), "фонд")], None, &[next.as_str()]),
            expected,
        )
        .await;
    }

    let mut config = create_test_config(&format!("{}/d0", base_url));
    config.crawler.max_depth = Some(1);

    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(fond_numbers(&outcome.records), vec!["0", "1"]);
    assert_eq!(outcome.report.status, CrawlStatus::Completed);
    assert_eq!(outcome.report.pages_processed, 2);
    assert_eq!(outcome.report.links_pruned_by_depth, 1);
    assert_eq!(outcome.report.pages_skipped, 0);
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // First request fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/list",
        listing("ГАРФ", &[("1", "Первый")], None, &[]),
        1,
    )
    .await;

    let config = create_test_config(&format!("{}/list", base_url));
    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.report.status, CrawlStatus::Completed);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/list",
        listing("ГАРФ", &[("1", "Первый")], None, &["/gone"]),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&format!("{}/list", base_url));
    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.report.failed_pages[0].kind, FailureKind::HttpError(404));
    assert_eq!(outcome.report.failed_pages[0].attempts, 1);
}

#[tokio::test]
async fn test_timeout_is_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/list",
        listing("ГАРФ", &[("1", "Первый")], None, &["/slow"]),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html(listing("ГАРФ", &[], None, &[])).set_delay(Duration::from_secs(3)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&format!("{}/list", base_url));
    config.crawler.request_timeout_ms = 300;
    config.retry.max_retries = 1;

    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    let failed = &outcome.report.failed_pages[0];
    assert_eq!(failed.kind, FailureKind::Timeout);
    assert_eq!(failed.attempts, 2);
}

#[tokio::test]
async fn test_shared_detail_link_is_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/list",
        listing("ГАРФ", &[], None, &["/a", "/b", "/c"]),
        1,
    )
    .await;

    for page in ["/a", "/b", "/c"] {
        mount_page(
            &mock_server,
            page,
            listing("ГАРФ", &[(page, "фонд")], None, &["/shared", "/list"]),
            1,
        )
        .await;
    }

    mount_page(
        &mock_server,
        "/shared",
        listing("ГАРФ", &[("shared", "общий фонд")], None, &["/a"]),
        1,
    )
    .await;

    let config = create_test_config(&format!("{}/list", base_url));
    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.report.pages_processed, 5);
    assert_eq!(outcome.records.len(), 4);
}

#[tokio::test]
async fn test_cyclic_pagination_terminates() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/a",
        listing("ГАРФ", &[("1", "Первый")], Some("/b"), &[]),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/b",
        listing("ГАРФ", &[("1", "Первый"), ("2", "Второй")], Some("/a"), &[]),
        1,
    )
    .await;

    let config = create_test_config(&format!("{}/a", base_url));
    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(fond_numbers(&outcome.records), vec!["1", "2"]);
    assert_eq!(outcome.report.duplicates_discarded, 1);
    assert_eq!(outcome.report.status, CrawlStatus::Completed);
}

#[tokio::test]
async fn test_max_pages_bounds_the_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for page in 1..=6 {
        let next = format!("/list/{}", page + 1);
        let number = page.to_string();
        let expected = if page <= 3 { 1 } else { 0 };
        mount_page(
            &mock_server,
            &format!("/list/{}", page),
            listing("ГАРФ", &[(number.as_str(), "фонд")], Some(next.as_str()), &[]),
            expected,
        )
        .await;
    }

    let mut config = create_test_config(&format!("{}/list/1", base_url));
    config.crawler.max_pages = Some(3);

    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(fond_numbers(&outcome.records), vec!["1", "2", "3"]);
    assert_eq!(outcome.report.pages_skipped, 1);
    assert_eq!(
        outcome.report.skipped_urls,
        vec![format!("{}/list/4", base_url)]
    );
}

#[tokio::test]
async fn test_cancellation_returns_partial_results() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/list",
        listing("ГАРФ", &[("1", "Первый")], None, &["/slow"]),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            html(listing("ГАРФ", &[("2", "Второй")], None, &[]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&format!("{}/list", base_url));
    config.crawler.request_timeout_ms = 60_000;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let outcome = run_crawl(&config, cancel).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(fond_numbers(&outcome.records), vec!["1"]);
    assert_eq!(outcome.report.status, CrawlStatus::Cancelled);
    assert_eq!(
        outcome.report.abandoned_urls,
        vec![format!("{}/slow", base_url)]
    );
}

#[tokio::test]
async fn test_links_to_other_hosts_are_ignored() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/list",
        listing(
            "ГАРФ",
            &[("1", "Первый")],
            None,
            &["http://elsewhere.invalid/fond/1", "mailto:archive@example.org", "#top"],
        ),
        1,
    )
    .await;

    let config = create_test_config(&format!("{}/list", base_url));
    let outcome = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.report.pages_discovered, 1);
    assert_eq!(outcome.report.status, CrawlStatus::Completed);
}
