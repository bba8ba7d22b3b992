//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listing site and run the
//! full discover, fetch, extract and write cycle end-to-end.

use boligscrape::config::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use boligscrape::crawler::{
    build_http_client, discover, rebuild_from_checkpoint, Coordinator, DiscoveryEnd,
    FetchFailure, IndexSelectors,
};
use boligscrape::output::{dataset_path, latest_path, null_rates_path, RawDataset};
use boligscrape::{RunState, ScrapeError};
use chrono::NaiveDate;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SENTINEL_PAGE: &str = r#"<html><body>
    <div class="css-16snok8">Ingen boliger matcher din søgning</div>
    </body></html>"#;

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(server_uri: &str, out: &Path) -> Config {
    Config {
        site: SiteConfig {
            base_url: format!("{}/lejligheder/?include_units=1", server_uri),
            page_size: 18,
            sentinel_selector: ".css-16snok8".to_string(),
            listing_selector: "div.css-krvsu4".to_string(),
        },
        crawler: CrawlerConfig {
            max_pages: 10,
            concurrency: Some(2),
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            raw_dir: out.join("raw").to_string_lossy().to_string(),
            stats_dir: out.join("stats").to_string_lossy().to_string(),
            write_page_checkpoint: true,
        },
    }
}

/// An index page with one listing container per id
fn index_page(ids: &[u32]) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="css-krvsu4"><a href="/lejligheder/id-{id}">Bolig {id}</a><a href="/favorit/{id}">Gem</a></div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", cards)
}

fn full_detail_page() -> &'static str {
    r#"<html><body>
    <nav class="css-7kp13n"><a>Lejligheder</a><a>København</a><a>Nørrebro</a></nav>
    <h3 class="css-1o5zkyw">3 værelses lejlighed på 78 m²</h3>
    <div class="css-1f7mpex">Lys lejlighed tæt på søerne.</div>
    <div class="css-o9y6d5">Jagtvej 12, 3. th</div>
    <div class="css-o9y6d5">2200 København N</div>
    <div class="css-woykcw"><span class="css-1fhvb05">12.500</span></div>
    <span class="css-30nv8k">850 kr.</span>
    <span class="css-30nv8k">37.500 kr.</span>
    <span class="css-2kngtw">1. april 2024</span>
    <span class="css-14bctuo">Lejeperiode</span>
    <span class="css-14bctuo">Ubegrænset</span>
    <div class="css-1n6wxiw"><span class="css-1td16zm">Etage</span><span class="css-1f8murc">3.</span></div>
    <div class="css-1n6wxiw"><span class="css-1td16zm">Husdyr tilladt</span><span class="css-1f8murc">Nej</span></div>
    </body></html>"#
}

fn sparse_detail_page() -> &'static str {
    r#"<html><body>
    <h3 class="css-1o5zkyw">Værelse udlejes</h3>
    <img class="css-rdsunt" src="/energy/C.svg">
    <div class="css-1n6wxiw"><span class="css-1td16zm">Møbleret</span><span class="css-1f8murc">Ja</span></div>
    </body></html>"#
}

async fn mount_index(server: &MockServer, offset: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/lejligheder/"))
        .and(query_param("offset", offset))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/lejligheder/id-{}", id)))
        .respond_with(response)
        .mount(server)
        .await;
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.into())
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Two index pages, a sentinel page, and three detail pages of which one 404s
async fn mount_site(server: &MockServer) {
    mount_index(server, "0", html(index_page(&[1, 2]))).await;
    mount_index(server, "18", html(index_page(&[2, 3]))).await;
    mount_index(server, "36", html(SENTINEL_PAGE)).await;

    mount_detail(server, 1, html(full_detail_page())).await;
    mount_detail(server, 2, html(sparse_detail_page())).await;
    mount_detail(server, 3, ResponseTemplate::new(404)).await;
}

#[tokio::test]
async fn test_full_crawl_writes_dataset() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let uri = mock_server.uri();

    let out = TempDir::new().unwrap();
    let config = create_test_config(&uri, out.path());
    let raw_dir = out.path().join("raw");

    let mut coordinator = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .with_date(run_date());
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(coordinator.state(), RunState::Written);
    assert_eq!(report.state, RunState::Written);
    assert_eq!(report.index_pages, 2);
    assert_eq!(report.discovery_end, Some(DiscoveryEnd::Sentinel));
    assert_eq!(report.links, 3, "repeated link should be fetched once");
    assert_eq!(report.fetched, 2);
    assert_eq!(report.records, 2);
    assert_eq!(
        report.fetch_failures,
        vec![(format!("{}/lejligheder/id-3", uri), FetchFailure::Status(404))]
    );

    // Both file names carry the same content
    let dated = dataset_path(&raw_dir, run_date());
    let latest = latest_path(&raw_dir);
    assert!(dated.ends_with("bolig_data_2024-03-01.csv"));
    assert_eq!(
        std::fs::read_to_string(&dated).unwrap(),
        std::fs::read_to_string(&latest).unwrap()
    );

    let dataset = RawDataset::read_path(&latest).unwrap();
    assert_eq!(dataset.len(), 2);

    let columns = dataset.columns();
    assert_eq!(columns[0], "url");
    assert_eq!(columns[10], "energy_mark_src");
    assert_eq!(columns[11..], ["Etage", "Husdyr tilladt", "Møbleret"]);

    let first = &dataset.records()[0];
    assert_eq!(first.url, format!("{}/lejligheder/id-1", uri));
    assert_eq!(
        first.breadcrumb.as_deref(),
        Some("Lejligheder > København > Nørrebro")
    );
    assert_eq!(
        first.address.as_deref(),
        Some("Jagtvej 12, 3. th, 2200 København N")
    );
    assert_eq!(first.monthly_rent.as_deref(), Some("12.500 kr."));
    assert_eq!(first.move_in_price.as_deref(), Some("37.500 kr."));
    assert_eq!(first.rental_period.as_deref(), Some("Ubegrænset"));
    assert_eq!(first.energy_mark_src.as_deref(), Some("none"));
    assert_eq!(first.characteristic("Etage"), Some("3."));
    assert_eq!(first.characteristic("Møbleret"), None);

    let second = &dataset.records()[1];
    assert_eq!(second.title.as_deref(), Some("Værelse udlejes"));
    assert_eq!(second.address, None);
    assert_eq!(second.energy_mark_src.as_deref(), Some("/energy/C.svg"));
    assert_eq!(second.characteristic("Møbleret"), Some("Ja"));

    // Side outputs
    let checkpoint = report.checkpoint.expect("Checkpoint not written");
    assert!(checkpoint.exists());
    let null_rates = null_rates_path(&out.path().join("stats"), run_date());
    assert_eq!(report.null_rates.as_deref(), Some(null_rates.as_path()));
    let rendered = std::fs::read_to_string(null_rates).unwrap();
    assert!(rendered.contains("address: 50.00% null"));
    assert!(!rendered.contains("title:"));
}

#[tokio::test]
async fn test_first_page_failure_is_fatal() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, "0", ResponseTemplate::new(503)).await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path());

    let mut coordinator = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .with_date(run_date());
    let result = coordinator.run().await;

    match result {
        Err(ScrapeError::FirstPage { url, reason }) => {
            assert!(url.contains("offset=0"));
            assert!(reason.contains("503"));
        }
        other => panic!("Expected first-page failure, got {:?}", other),
    }
    assert_eq!(coordinator.state(), RunState::Failed);
    assert!(!out.path().join("raw").exists(), "no file may be written");
}

#[tokio::test]
async fn test_later_index_failure_keeps_earlier_pages() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, "0", html(index_page(&[1, 2]))).await;
    mount_index(&mock_server, "18", ResponseTemplate::new(500)).await;
    mount_detail(&mock_server, 1, html(full_detail_page())).await;
    mount_detail(&mock_server, 2, html(sparse_detail_page())).await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path());

    let report = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .with_date(run_date())
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.discovery_end, Some(DiscoveryEnd::FetchFailed));
    assert_eq!(report.index_pages, 1);
    assert_eq!(report.records, 2);
    assert!(report.fetch_failures.is_empty());
}

#[tokio::test]
async fn test_page_cap_stops_discovery() {
    let mock_server = MockServer::start().await;
    // Every offset returns the same non-empty page; the sentinel never shows
    Mock::given(method("GET"))
        .and(path("/lejligheder/"))
        .respond_with(html(index_page(&[1])))
        .mount(&mock_server)
        .await;
    mount_detail(&mock_server, 1, html(full_detail_page())).await;

    let out = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), out.path());
    config.crawler.max_pages = 3;

    let report = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .with_date(run_date())
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.discovery_end, Some(DiscoveryEnd::PageCap));
    assert_eq!(report.index_pages, 3);
    assert_eq!(report.links, 1);
    assert_eq!(report.records, 1);
}

#[tokio::test]
async fn test_discovery_is_repeatable() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path());
    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let selectors = IndexSelectors::from_config(&config.site).unwrap();
    let cancel = CancellationToken::new();

    let first = discover(&client, &config.site, &selectors, 10, &cancel)
        .await
        .unwrap();
    let second = discover(&client, &config.site, &selectors, 10, &cancel)
        .await
        .unwrap();

    assert_eq!(first.pages, second.pages);
    assert_eq!(first.end, second.end);
    let offsets: Vec<u64> = first.pages.iter().map(|p| p.offset).collect();
    assert_eq!(offsets, vec![0, 18]);
}

#[tokio::test]
async fn test_empty_first_page_writes_header_only() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, "0", html(SENTINEL_PAGE)).await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path());

    let report = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .with_date(run_date())
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.index_pages, 0);
    assert_eq!(report.links, 0);
    assert_eq!(report.records, 0);

    let dataset = RawDataset::read_path(&latest_path(&out.path().join("raw"))).unwrap();
    assert!(dataset.is_empty());
    assert_eq!(dataset.columns().len(), 11);
}

#[tokio::test]
async fn test_rebuild_matches_crawl() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path());

    let crawled = Coordinator::new(config.clone(), CancellationToken::new())
        .unwrap()
        .with_date(run_date())
        .run()
        .await
        .expect("Crawl failed");
    let checkpoint = crawled.checkpoint.clone().unwrap();
    let latest = latest_path(&out.path().join("raw"));
    let crawled_csv = std::fs::read_to_string(&latest).unwrap();

    // Take the site away; the rebuild must not need it
    drop(mock_server);

    let rebuilt = rebuild_from_checkpoint(&config, &checkpoint, run_date())
        .await
        .expect("Rebuild failed");

    assert_eq!(rebuilt.records, crawled.records);
    assert_eq!(std::fs::read_to_string(&latest).unwrap(), crawled_csv);
}

#[tokio::test]
async fn test_cancel_during_discovery_keeps_collected_pages() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, "0", html(index_page(&[1, 2]))).await;
    mount_index(
        &mock_server,
        "18",
        html(index_page(&[3])).set_delay(Duration::from_millis(800)),
    )
    .await;
    mount_index(&mock_server, "36", html(index_page(&[4]))).await;
    for id in 1..=4 {
        mount_detail(&mock_server, id, html(full_detail_page())).await;
    }

    let out = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path());

    // Fires while the second index page is still in flight
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let report = Coordinator::new(config, cancel)
        .unwrap()
        .with_date(run_date())
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.state, RunState::Written);
    assert_eq!(report.discovery_end, Some(DiscoveryEnd::Cancelled));
    assert_eq!(report.index_pages, 2);
    assert_eq!(report.links, 3);
    assert_eq!(report.records, 0);
    assert_eq!(report.fetch_failures.len(), 3);
    assert!(report
        .fetch_failures
        .iter()
        .all(|(_, failure)| *failure == FetchFailure::Cancelled));

    let dataset = RawDataset::read_path(&latest_path(&out.path().join("raw"))).unwrap();
    assert!(dataset.is_empty());
}

#[tokio::test]
async fn test_slow_detail_page_times_out() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, "0", html(index_page(&[1, 2]))).await;
    mount_index(&mock_server, "18", html(SENTINEL_PAGE)).await;
    mount_detail(&mock_server, 1, html(full_detail_page())).await;
    mount_detail(
        &mock_server,
        2,
        html(sparse_detail_page()).set_delay(Duration::from_secs(3)),
    )
    .await;

    let out = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), out.path());
    config.crawler.request_timeout_secs = 1;

    let report = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .with_date(run_date())
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.records, 1);
    assert_eq!(
        report.fetch_failures,
        vec![(
            format!("{}/lejligheder/id-2", mock_server.uri()),
            FetchFailure::Timeout
        )]
    );
}
