//! Category crawls against a mock retailer
//!
//! Each test wires an HTTP fetcher and a CSS extractor to a wiremock server
//! and crawls one category.

use crate::common::{listing_page, listing_selectors, mount_page, mount_robots};
use aisle_sweep::catalog::{CategorySource, IdentityPolicy, PageNumbering};
use aisle_sweep::crawler::{
    open_session, ClientProfile, CssItemExtractor, HostPacer, HttpPageFetcher, HttpSession,
    PageProbes, PaginatedCatalogCrawler, ProfileCache, SessionOptions, TerminationPolicy,
};
use aisle_sweep::robots::RobotsCache;
use aisle_sweep::state::TerminalCause;
use aisle_sweep::SweepError;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BAKERY: &str = "/groceries/bakery";

fn profile(name: &str, user_agent: &str) -> ClientProfile {
    ClientProfile {
        name: name.to_string(),
        user_agent: user_agent.to_string(),
        accept_language: Some("en-GB,en;q=0.9".to_string()),
    }
}

fn options() -> SessionOptions {
    SessionOptions {
        request_timeout: Duration::from_secs(5),
        https_only: false,
    }
}

fn bakery(server: &MockServer) -> CategorySource {
    let locator = Url::parse(&format!("{}{}", server.uri(), BAKERY)).unwrap();
    CategorySource::new("testmart", "Bakery", locator, PageNumbering::query("page"))
}

async fn session() -> HttpSession {
    let mut cache = ProfileCache::new();
    open_session(
        "testmart",
        None,
        &[profile("AisleSweep", "AisleSweep/1.0 (+https://example.com/bot)")],
        &options(),
        &mut cache,
    )
    .await
    .unwrap()
}

async fn fetcher(respect_robots: bool) -> HttpPageFetcher {
    let robots = respect_robots.then(|| Arc::new(RobotsCache::new()));
    HttpPageFetcher::new(
        session().await,
        Arc::new(HostPacer::new(Duration::ZERO, Duration::ZERO)),
        robots,
        PageProbes::new(&listing_selectors()).unwrap(),
    )
}

fn crawler(max_pages: u32, max_consecutive_empty_pages: u32) -> PaginatedCatalogCrawler {
    PaginatedCatalogCrawler::new(TerminationPolicy {
        max_pages,
        max_consecutive_empty_pages,
        duplicate_overlap_threshold: 0.9,
        identity: IdentityPolicy::NameAndPrice,
    })
}

#[tokio::test]
async fn test_crawl_stops_at_end_marker() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BAKERY,
        1,
        listing_page(
            &[("Crumpets", "£0.85"), ("Bagels", "£1.20"), ("Brioche", "£1.75")],
            false,
        ),
    )
    .await;
    mount_page(
        &server,
        BAKERY,
        2,
        listing_page(&[("Pitta Bread", "£0.60"), ("Rye Loaf", "£2.10")], true),
    )
    .await;

    let fetcher = fetcher(true).await;
    let extractor = CssItemExtractor::new(&listing_selectors()).unwrap();
    let report = crawler(50, 3)
        .crawl(&bakery(&server), &fetcher, &extractor)
        .await
        .unwrap();

    assert_eq!(report.cause, TerminalCause::EndMarker);
    assert_eq!(report.pages_visited, 2);
    let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Crumpets", "Bagels", "Brioche", "Pitta Bread", "Rye Loaf"]
    );
    assert!(report.records.iter().all(|r| r.category == "Bakery"));
    assert_eq!(report.records[0].price, "£0.85");
    assert_eq!(report.last_fetch_error, None);
}

#[tokio::test]
async fn test_crawl_stops_on_repeated_page() {
    let server = MockServer::start().await;
    // Ignores the page parameter, as some retailers do past the last page
    Mock::given(method("GET"))
        .and(path(BAKERY))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(
            &[("Crumpets", "£0.85"), ("Bagels", "£1.20")],
            false,
        )))
        .mount(&server)
        .await;

    let fetcher = fetcher(false).await;
    let extractor = CssItemExtractor::new(&listing_selectors()).unwrap();
    let report = crawler(50, 3)
        .crawl(&bakery(&server), &fetcher, &extractor)
        .await
        .unwrap();

    assert_eq!(report.cause, TerminalCause::DuplicateOverlap);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.accepted(), 2);
    assert_eq!(report.duplicates, 2);
}

#[tokio::test]
async fn test_crawl_respects_page_ceiling() {
    let server = MockServer::start().await;
    for page in 1..=3 {
        mount_page(
            &server,
            BAKERY,
            page,
            listing_page(&[(format!("Loaf {}", page).as_str(), "£1.00")], false),
        )
        .await;
    }

    let fetcher = fetcher(false).await;
    let extractor = CssItemExtractor::new(&listing_selectors()).unwrap();
    let report = crawler(2, 3)
        .crawl(&bakery(&server), &fetcher, &extractor)
        .await
        .unwrap();

    assert_eq!(report.cause, TerminalCause::PageCeiling);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.accepted(), 2);
}

#[tokio::test]
async fn test_missing_listing_content_counts_toward_empty_streak() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BAKERY,
        1,
        listing_page(&[("Crumpets", "£0.85")], false),
    )
    .await;
    for page in 2..=3 {
        mount_page(
            &server,
            BAKERY,
            page,
            "<html><body><p>Something went wrong</p></body></html>".to_string(),
        )
        .await;
    }

    let fetcher = fetcher(false).await;
    let extractor = CssItemExtractor::new(&listing_selectors()).unwrap();
    let report = crawler(50, 2)
        .crawl(&bakery(&server), &fetcher, &extractor)
        .await
        .unwrap();

    assert_eq!(report.cause, TerminalCause::EmptyStreak);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.accepted(), 1);
    assert!(report
        .last_fetch_error
        .as_deref()
        .unwrap()
        .contains("No listing content"));
}

#[tokio::test]
async fn test_server_error_ends_crawl_with_partial_results() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BAKERY,
        1,
        listing_page(&[("Crumpets", "£0.85"), ("Bagels", "£1.20")], false),
    )
    .await;
    // Page 2 is not mounted: wiremock answers 404

    let fetcher = fetcher(false).await;
    let extractor = CssItemExtractor::new(&listing_selectors()).unwrap();
    let report = crawler(50, 3)
        .crawl(&bakery(&server), &fetcher, &extractor)
        .await
        .unwrap();

    assert_eq!(report.cause, TerminalCause::FetchFailed);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.accepted(), 2);
    assert!(report.last_fetch_error.as_deref().unwrap().contains("HTTP 404"));
}

#[tokio::test]
async fn test_robots_disallow_prevents_fetch() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /groceries/\n").await;
    mount_page(
        &server,
        BAKERY,
        1,
        listing_page(&[("Crumpets", "£0.85")], true),
    )
    .await;

    let fetcher = fetcher(true).await;
    let extractor = CssItemExtractor::new(&listing_selectors()).unwrap();
    let report = crawler(50, 3)
        .crawl(&bakery(&server), &fetcher, &extractor)
        .await
        .unwrap();

    assert_eq!(report.cause, TerminalCause::FetchFailed);
    assert!(report.records.is_empty());
    assert!(report.last_fetch_error.as_deref().unwrap().contains("robots.txt"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == "/robots.txt"));
}

#[tokio::test]
async fn test_open_session_falls_back_to_next_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/probe"))
        .and(header("user-agent", "Mozilla/5.0 (X11; Linux x86_64)"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let probe = Url::parse(&format!("{}/probe", server.uri())).unwrap();
    let profiles = vec![
        profile("bot", "AisleSweep/1.0 (+https://example.com/bot)"),
        profile("desktop", "Mozilla/5.0 (X11; Linux x86_64)"),
    ];
    let mut cache = ProfileCache::new();

    let session = open_session("testmart", Some(&probe), &profiles, &options(), &mut cache)
        .await
        .unwrap();
    assert_eq!(session.profile().name, "desktop");
    assert_eq!(cache.get("testmart"), Some("desktop"));

    // The remembered profile is tried first next time
    let session = open_session("testmart", Some(&probe), &profiles, &options(), &mut cache)
        .await
        .unwrap();
    assert_eq!(session.profile().name, "desktop");
    let probes = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/probe")
        .count();
    assert_eq!(probes, 3);
}

#[tokio::test]
async fn test_open_session_fails_when_every_profile_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let probe = Url::parse(&format!("{}/probe", server.uri())).unwrap();
    let profiles = vec![
        profile("bot", "AisleSweep/1.0"),
        profile("desktop", "Mozilla/5.0 (X11; Linux x86_64)"),
    ];
    let mut cache = ProfileCache::new();
    cache.remember("testmart", "desktop");

    let result = open_session("testmart", Some(&probe), &profiles, &options(), &mut cache).await;
    assert!(matches!(
        result,
        Err(SweepError::NoSession { attempts: 2, .. })
    ));
    assert_eq!(cache.get("testmart"), None);
}
