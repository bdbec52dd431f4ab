//! Page fetching
//!
//! This module defines the seam between the crawl loop and the network:
//! - The `PageFetcher` contract and the `PageHandle` it returns
//! - Classification of fetch failures into soft and hard
//! - Content and next-page probes run against a fetched body
//! - The HTTP implementation used for real retailers

use crate::catalog::{CategorySource, SelectorSet};
use crate::crawler::pacing::HostPacer;
use crate::crawler::session::HttpSession;
use crate::robots::RobotsCache;
use crate::url::extract_domain;
use crate::ConfigError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// One fetched listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle {
    /// 1-based page number within the category
    pub page_index: u32,

    /// URL the page was requested from
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Page body
    pub body: String,

    /// Whether the markup says another page follows, if it says at all
    pub has_next_page: Option<bool>,
}

/// Why a page could not be fetched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("No listing content at {url}")]
    NoContent { url: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Disallowed by robots.txt: {url}")]
    Disallowed { url: String },

    #[error("Cannot build page URL: {0}")]
    InvalidUrl(String),
}

impl FetchFailure {
    /// Soft failures count as an empty page; hard failures end the crawl
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NoContent { .. })
    }
}

/// Retrieves one page of a category listing
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the given 1-based page of a category
    ///
    /// # Arguments
    ///
    /// * `source` - The category being crawled
    /// * `page_index` - Page number, starting at 1
    ///
    /// # Returns
    ///
    /// * `Ok(PageHandle)` - The page body and its next-page signal
    /// * `Err(FetchFailure)` - The page could not be fetched
    async fn fetch(&self, source: &CategorySource, page_index: u32)
        -> Result<PageHandle, FetchFailure>;
}

/// What the probes found in a page body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// None of the wait-for selectors matched
    NoContent,

    /// Listing content is present
    Listing { has_next_page: Option<bool> },
}

/// Compiled wait-for and next-page selectors
#[derive(Debug, Clone)]
pub struct PageProbes {
    wait_for: Vec<Selector>,
    next_enabled: Vec<Selector>,
    next_disabled: Vec<Selector>,
}

pub(crate) fn compile_selectors(
    field: &str,
    selectors: &[String],
) -> Result<Vec<Selector>, ConfigError> {
    selectors
        .iter()
        .map(|s| {
            Selector::parse(s)
                .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", field, s, e)))
        })
        .collect()
}

impl PageProbes {
    /// Compiles the probe selectors of a retailer
    ///
    /// # Returns
    ///
    /// * `Ok(PageProbes)` - All selectors compiled
    /// * `Err(ConfigError::InvalidSelector)` - A selector failed to parse
    pub fn new(selectors: &SelectorSet) -> Result<Self, ConfigError> {
        Ok(Self {
            wait_for: compile_selectors("wait-for", &selectors.wait_for)?,
            next_enabled: compile_selectors("next-enabled", &selectors.next_enabled)?,
            next_disabled: compile_selectors("next-disabled", &selectors.next_disabled)?,
        })
    }

    /// Runs the probes against a page body
    ///
    /// A disabled next control wins over an enabled one. Without any next
    /// selectors the page gives no signal.
    pub fn inspect(&self, body: &str) -> ProbeOutcome {
        if body.trim().is_empty() {
            return ProbeOutcome::NoContent;
        }

        let document = Html::parse_document(body);
        let matches = |selectors: &[Selector]| {
            selectors
                .iter()
                .any(|s| document.select(s).next().is_some())
        };

        if !self.wait_for.is_empty() && !matches(&self.wait_for) {
            return ProbeOutcome::NoContent;
        }

        let has_next_page = if matches(&self.next_disabled) {
            Some(false)
        } else if !self.next_enabled.is_empty() {
            Some(matches(&self.next_enabled))
        } else {
            None
        };

        ProbeOutcome::Listing { has_next_page }
    }
}

/// Fetches listing pages over HTTP within a retailer session
pub struct HttpPageFetcher {
    session: HttpSession,
    pacer: Arc<HostPacer>,
    robots: Option<Arc<RobotsCache>>,
    probes: PageProbes,
}

impl HttpPageFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `session` - The retailer session whose client issues requests
    /// * `pacer` - Per-host pacing shared by every crawl of the retailer
    /// * `robots` - robots.txt cache, or `None` to skip robots checks
    /// * `probes` - Content and next-page probes for the retailer's markup
    pub fn new(
        session: HttpSession,
        pacer: Arc<HostPacer>,
        robots: Option<Arc<RobotsCache>>,
        probes: PageProbes,
    ) -> Self {
        Self {
            session,
            pacer,
            robots,
            probes,
        }
    }

    pub fn session(&self) -> &HttpSession {
        &self.session
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(
        &self,
        source: &CategorySource,
        page_index: u32,
    ) -> Result<PageHandle, FetchFailure> {
        let url = source
            .page_url(page_index)
            .map_err(|e| FetchFailure::InvalidUrl(e.to_string()))?;
        let host = extract_domain(&url)
            .ok_or_else(|| FetchFailure::InvalidUrl(format!("{} has no host", url)))?;

        let mut crawl_delay = None;
        if let Some(robots) = &self.robots {
            let agent = self.session.profile().agent_token();
            let verdict = robots.check(self.session.client(), &url, agent).await;
            if !verdict.allowed {
                return Err(FetchFailure::Disallowed {
                    url: url.to_string(),
                });
            }
            crawl_delay = verdict.crawl_delay;
        }

        self.pacer.wait_turn(&host, crawl_delay).await;
        tracing::debug!("GET {}", url);

        let response = match self.session.client().get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(FetchFailure::Timeout {
                    url: url.to_string(),
                })
            }
            Err(e) => {
                let message = if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    e.to_string()
                };
                return Err(FetchFailure::Network {
                    url: url.to_string(),
                    message,
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Err(FetchFailure::Timeout {
                    url: url.to_string(),
                })
            }
            Err(e) => {
                return Err(FetchFailure::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };

        match self.probes.inspect(&body) {
            ProbeOutcome::NoContent => Err(FetchFailure::NoContent {
                url: url.to_string(),
            }),
            ProbeOutcome::Listing { has_next_page } => Ok(PageHandle {
                page_index,
                url,
                status: status.as_u16(),
                body,
                has_next_page,
            }),
        }
    }
}
