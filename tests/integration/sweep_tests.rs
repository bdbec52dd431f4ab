//! Full sweeps against mock retailers
//!
//! Each test writes a configuration pointing at a wiremock server, runs the
//! coordinator, then reopens the database to check what was stored.

use crate::common::{listing_page, mount_page};
use aisle_sweep::config::{parse_config, Config};
use aisle_sweep::crawler::{run_sweep, Coordinator};
use aisle_sweep::state::TerminalCause;
use aisle_sweep::storage::{RetailerStatus, RunStatus, SqliteStorage, Storage};
use aisle_sweep::SweepError;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SELECTORS: &str = r#"
[retailer.paging]
style = "query"
param = "page"

[retailer.selectors]
item = ["li.product"]
name = [".name"]
price = [".price"]
price-pattern = '£\d+\.\d{2}'
wait-for = ["ul.grid"]
next-enabled = ["a.next"]
next-disabled = [".next.disabled"]
"#;

/// Builds a configuration with one retailer per `(name, extra)` entry
///
/// `extra` is appended to the retailer table and may add a probe URL or
/// categories.
fn create_test_config(dir: &TempDir, retailers: &[(&str, String)]) -> Config {
    let mut toml = format!(
        r#"
[crawler]
max-pages = 10
max-consecutive-empty-pages = 2
duplicate-overlap-threshold = 0.9
max-concurrent-categories = 2
minimum-time-on-page = 0
page-jitter = 0
request-timeout = 5
https-only = false

[output]
database-path = "{}"
summary-path = "{}"
low-yield-threshold = 2

[[client-profile]]
name = "AisleSweep"
user-agent = "AisleSweep/1.0 (+https://example.com/bot)"
"#,
        dir.path().join("sweep.db").display(),
        dir.path().join("summary.md").display()
    );

    for (name, extra) in retailers {
        toml.push_str(&format!(
            "\n[[retailer]]\nname = \"{}\"\ntimeout-minutes = 1\n{}\n{}\n",
            name, extra, SELECTORS
        ));
    }

    parse_config(&toml).unwrap()
}

fn category(uri: &str, listing_path: &str, label: &str) -> String {
    format!(
        "[[retailer.category]]\nurl = \"{}{}\"\nlabel = \"{}\"\n",
        uri, listing_path, label
    )
}

async fn mount_testmart(server: &MockServer) {
    mount_page(
        server,
        "/bakery",
        1,
        listing_page(&[("Crumpets", "£0.85"), ("Bagels", "£1.20")], false),
    )
    .await;
    mount_page(
        server,
        "/bakery",
        2,
        listing_page(&[("Brioche", "£1.75")], true),
    )
    .await;
    mount_page(
        server,
        "/dairy",
        1,
        listing_page(&[("Whole Milk", "£1.45"), ("Crumpets", "£0.85")], true),
    )
    .await;
}

#[tokio::test]
async fn test_full_sweep_single_retailer() {
    let server = MockServer::start().await;
    mount_testmart(&server).await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let categories = format!(
        "{}{}",
        category(&uri, "/bakery", "Bakery"),
        category(&uri, "/dairy", "Dairy")
    );
    let config = create_test_config(&dir, &[("testmart", categories)]);
    let db_path = config.output.database_path.clone();
    let summary_path = config.output.summary_path.clone();

    let summary = run_sweep(config, "test-hash", &[]).await.unwrap();
    assert_eq!(summary.status, "completed");
    assert_eq!(summary.total_categories(), 2);
    assert_eq!(summary.completed_retailers(), 1);

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");

    let retailers = storage.get_retailer_runs(run.id).unwrap();
    assert_eq!(retailers.len(), 1);
    assert_eq!(retailers[0].status, RetailerStatus::Completed);
    assert_eq!(retailers[0].profile.as_deref(), Some("AisleSweep"));
    assert_eq!(retailers[0].categories, 2);
    assert_eq!(retailers[0].products, 4);

    let crawls = storage.get_category_crawls(run.id).unwrap();
    assert_eq!(crawls.len(), 2);
    let bakery = crawls.iter().find(|c| c.category == "Bakery").unwrap();
    assert_eq!(bakery.cause, Some(TerminalCause::EndMarker));
    assert_eq!(bakery.pages_visited, 2);
    assert_eq!(bakery.items_accepted, 3);
    let dairy = crawls.iter().find(|c| c.category == "Dairy").unwrap();
    assert_eq!(dairy.cause, Some(TerminalCause::EndMarker));
    assert_eq!(dairy.items_accepted, 2);

    // Crumpets are listed under both categories but stored once, under Bakery
    let products = storage.get_products(run.id, "testmart").unwrap();
    let rows: Vec<(&str, &str)> = products
        .iter()
        .map(|p| (p.category.as_str(), p.name.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Bakery", "Bagels"),
            ("Bakery", "Brioche"),
            ("Bakery", "Crumpets"),
            ("Dairy", "Whole Milk"),
        ]
    );

    let markdown = std::fs::read_to_string(&summary_path).unwrap();
    assert!(markdown.contains("# Aisle-Sweep Run Summary"));
    assert!(markdown.contains("testmart"));
}

#[tokio::test]
async fn test_retailer_without_session_does_not_stop_sweep() {
    let server = MockServer::start().await;
    mount_testmart(&server).await;
    Mock::given(method("GET"))
        .and(path("/closed/probe"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let closed = format!(
        "probe-url = \"{}/closed/probe\"\n{}",
        uri,
        category(&uri, "/closed/bakery", "Bakery")
    );
    let open = category(&uri, "/bakery", "Bakery");
    let config = create_test_config(&dir, &[("closedmart", closed), ("testmart", open)]);
    let db_path = config.output.database_path.clone();

    let mut coordinator = Coordinator::new(config, "test-hash").unwrap();
    let run_id = coordinator.run_id();
    let summary = coordinator.run(&[]).await.unwrap();
    assert_eq!(summary.completed_retailers(), 1);
    assert_eq!(coordinator.profile_cache().get("closedmart"), None);
    assert_eq!(coordinator.profile_cache().get("testmart"), Some("AisleSweep"));

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let retailers = storage.get_retailer_runs(run_id).unwrap();
    assert_eq!(retailers.len(), 2);
    assert_eq!(retailers[0].retailer, "closedmart");
    assert_eq!(retailers[0].status, RetailerStatus::NoSession);
    assert!(retailers[0].error_message.is_some());
    assert_eq!(retailers[1].retailer, "testmart");
    assert_eq!(retailers[1].status, RetailerStatus::Completed);

    assert!(storage.get_products(run_id, "closedmart").unwrap().is_empty());
    assert_eq!(storage.get_products(run_id, "testmart").unwrap().len(), 3);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/closed/bakery"));
}

#[tokio::test]
async fn test_retailer_filter() {
    let server = MockServer::start().await;
    mount_testmart(&server).await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let config = create_test_config(
        &dir,
        &[
            ("testmart", category(&uri, "/bakery", "Bakery")),
            ("othermart", category(&uri, "/other", "Other")),
        ],
    );
    let db_path = config.output.database_path.clone();

    let filter = vec!["TESTMART".to_string()];
    let summary = run_sweep(config.clone(), "test-hash", &filter).await.unwrap();
    assert_eq!(summary.retailers.len(), 1);
    assert_eq!(summary.retailers[0].retailer, "testmart");

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(storage.get_category_crawls(run.id).unwrap().len(), 1);

    let unknown = vec!["nomart".to_string()];
    let result = run_sweep(config, "test-hash", &unknown).await;
    assert!(matches!(result, Err(SweepError::UnknownRetailer(name)) if name == "nomart"));
}

#[tokio::test]
async fn test_low_yield_category_is_reported() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/flowers",
        1,
        listing_page(&[("Tulips", "£4.00")], true),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let config = create_test_config(&dir, &[("testmart", category(&uri, "/flowers", "Flowers"))]);

    let summary = run_sweep(config, "test-hash", &[]).await.unwrap();
    assert_eq!(summary.low_yield.len(), 1);
    assert_eq!(summary.low_yield[0].category, "Flowers");
    assert_eq!(summary.low_yield[0].items_accepted, 1);
}
