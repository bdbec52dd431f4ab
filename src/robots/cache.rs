//! Robots.txt caching
//!
//! Entries are kept per host and refetched once they are 24 hours old.

use crate::robots::{fetch_robots, ParsedRobots};
use crate::url::extract_domain;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use url::Url;

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Wraps freshly fetched robots.txt data
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the entry is older than 24 hours
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(24)
    }

    /// Returns how long ago the entry was fetched
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// Outcome of a robots.txt check for one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotsVerdict {
    /// Whether the page may be fetched
    pub allowed: bool,

    /// Crawl delay requested for the agent, in seconds
    pub crawl_delay: Option<f64>,
}

/// Shared per-host robots.txt cache
///
/// Safe to share between concurrent category crawls; a host's robots.txt is
/// fetched at most once per staleness window.
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the cache for a host, replacing any existing entry
    pub async fn insert(&self, host: &str, robots: ParsedRobots) {
        self.entries
            .lock()
            .await
            .insert(host.to_string(), CachedRobots::new(robots));
    }

    /// Number of hosts currently cached
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Checks a page against its host's robots.txt, fetching it if needed
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for the robots.txt request
    /// * `url` - The page about to be fetched
    /// * `agent` - Product token matched against `User-agent` groups
    pub async fn check(&self, client: &Client, url: &Url, agent: &str) -> RobotsVerdict {
        let Some(host) = extract_domain(url) else {
            return RobotsVerdict {
                allowed: true,
                crawl_delay: None,
            };
        };

        // The lock is held across the fetch so concurrent crawls of one host
        // wait for a single robots.txt request.
        let mut entries = self.entries.lock().await;
        let needs_fetch = entries.get(&host).map_or(true, CachedRobots::is_stale);

        if needs_fetch {
            tracing::debug!("Fetching robots.txt for host: {}", host);
            let robots = fetch_robots(client, url).await;
            entries.insert(host.clone(), CachedRobots::new(robots));
        }

        match entries.get(&host) {
            Some(cached) => RobotsVerdict {
                allowed: cached.content.is_allowed(url.as_str(), agent),
                crawl_delay: cached.content.crawl_delay(agent),
            },
            None => RobotsVerdict {
                allowed: true,
                crawl_delay: None,
            },
        }
    }
}
