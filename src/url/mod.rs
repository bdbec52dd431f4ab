//! URL handling module for Aisle-Sweep
//!
//! This module provides host extraction for pacing, category label derivation,
//! and parsing of configured category URLs.

mod domain;
mod label;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use label::{derive_category_label, UNKNOWN_LABEL};

/// Parses a configured listing URL
///
/// # Arguments
///
/// * `raw` - The URL as written in the configuration
/// * `https_only` - Reject anything but `https`
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - The URL is unparseable, has the wrong scheme, or lacks a host
pub fn parse_listing_url(raw: &str, https_only: bool) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "https" => {}
        "http" if !https_only => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Returns the robots.txt location for the origin of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use aisle_sweep::url::robots_url;
///
/// let page = Url::parse("https://www.tesco.com/groceries/en-GB/shop/fresh-food/all?page=2").unwrap();
/// assert_eq!(robots_url(&page).unwrap().as_str(), "https://www.tesco.com/robots.txt");
/// ```
pub fn robots_url(url: &Url) -> Result<Url, UrlError> {
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }
    url.join("/robots.txt")
        .map_err(|e| UrlError::Malformed(e.to_string()))
}
