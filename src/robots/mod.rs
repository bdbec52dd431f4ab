//! Robots.txt handling module
//!
//! This module fetches, parses, and caches robots.txt files so listing pages
//! are only requested where the retailer allows it.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache, RobotsVerdict};
pub use parser::ParsedRobots;

use crate::url::robots_url;
use reqwest::Client;
use url::Url;

/// Fetches robots.txt for the origin of a page
///
/// Any failure (no host, network error, non-success status) yields a
/// permissive policy; only a 2xx body is interpreted.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `page` - Any URL on the host whose robots.txt is wanted
pub async fn fetch_robots(client: &Client, page: &Url) -> ParsedRobots {
    let location = match robots_url(page) {
        Ok(location) => location,
        Err(e) => {
            tracing::debug!("No robots.txt location for {}: {}", page, e);
            return ParsedRobots::allow_all();
        }
    };

    let response = match client.get(location.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("robots.txt unreachable at {}: {}", location, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "robots.txt at {} returned HTTP {}, allowing all",
            location,
            response.status().as_u16()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::debug!("Failed to read robots.txt at {}: {}", location, e);
            ParsedRobots::allow_all()
        }
    }
}
