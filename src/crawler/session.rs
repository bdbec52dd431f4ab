//! Retailer session setup
//!
//! Retailers differ in which client identities they serve. Profiles are
//! tried in configured order until one works; the winner is remembered per
//! retailer in a caller-owned [`ProfileCache`] and tried first next time.

use crate::config::{ClientProfileConfig, CrawlerConfig};
use crate::{ConfigError, SweepError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// One HTTP client identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProfile {
    pub name: String,
    pub user_agent: String,
    pub accept_language: Option<String>,
}

impl ClientProfile {
    /// Product token used when matching robots.txt groups
    ///
    /// "AisleSweep/1.0 (+https://...)" yields "AisleSweep".
    pub fn agent_token(&self) -> &str {
        self.user_agent
            .split(|c: char| c == '/' || c.is_whitespace())
            .find(|token| !token.is_empty())
            .unwrap_or(&self.user_agent)
    }
}

impl From<&ClientProfileConfig> for ClientProfile {
    fn from(config: &ClientProfileConfig) -> Self {
        Self {
            name: config.name.clone(),
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
        }
    }
}

/// Transport settings shared by every profile
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub request_timeout: Duration,
    pub https_only: bool,
}

impl SessionOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout),
            https_only: config.https_only,
        }
    }
}

/// Last working profile per retailer
///
/// Owned by whoever runs the retailers, and passed in explicitly.
#[derive(Debug, Clone, Default)]
pub struct ProfileCache {
    working: HashMap<String, String>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the profile that last worked for the retailer
    pub fn get(&self, retailer: &str) -> Option<&str> {
        self.working.get(retailer).map(String::as_str)
    }

    pub fn remember(&mut self, retailer: &str, profile: &str) {
        self.working
            .insert(retailer.to_string(), profile.to_string());
    }

    pub fn forget(&mut self, retailer: &str) {
        self.working.remove(retailer);
    }
}

/// An open session with one retailer
///
/// Dropping the session releases its connection pool.
#[derive(Debug, Clone)]
pub struct HttpSession {
    retailer: String,
    profile: ClientProfile,
    client: Client,
}

impl HttpSession {
    pub fn retailer(&self) -> &str {
        &self.retailer
    }

    pub fn profile(&self) -> &ClientProfile {
        &self.profile
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Builds an HTTP client for a profile
///
/// # Arguments
///
/// * `profile` - The identity to present
/// * `options` - Timeouts and scheme restrictions
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(SweepError)` - A header value is invalid or the TLS backend failed
pub fn build_http_client(
    profile: &ClientProfile,
    options: &SessionOptions,
) -> Result<Client, SweepError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    if let Some(language) = &profile.accept_language {
        let value = HeaderValue::from_str(language).map_err(|e| {
            ConfigError::Validation(format!(
                "client-profile '{}': invalid accept-language: {}",
                profile.name, e
            ))
        })?;
        headers.insert(ACCEPT_LANGUAGE, value);
    }

    let client = Client::builder()
        .user_agent(profile.user_agent.as_str())
        .default_headers(headers)
        .timeout(options.request_timeout)
        .connect_timeout(std::cmp::min(options.request_timeout, Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .https_only(options.https_only)
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Orders profiles with the cached winner first, the rest as configured
fn candidate_order<'a>(
    retailer: &str,
    profiles: &'a [ClientProfile],
    cache: &ProfileCache,
) -> Vec<&'a ClientProfile> {
    let preferred = cache.get(retailer);
    let mut ordered: Vec<&ClientProfile> = profiles
        .iter()
        .filter(|p| Some(p.name.as_str()) == preferred)
        .collect();
    ordered.extend(
        profiles
            .iter()
            .filter(|p| Some(p.name.as_str()) != preferred),
    );
    ordered
}

/// Opens a session with a retailer using the first profile that works
///
/// A profile works when its client builds and, if a probe URL is given,
/// a GET of the probe URL returns a success status.
///
/// # Arguments
///
/// * `retailer` - Retailer name, the key into `cache`
/// * `probe_url` - Optional URL confirming the retailer serves this profile
/// * `profiles` - Candidate profiles in preference order
/// * `options` - Transport settings
/// * `cache` - Last working profile per retailer; updated on return
///
/// # Returns
///
/// * `Ok(HttpSession)` - A session using the first working profile
/// * `Err(SweepError::NoSession)` - Every profile failed
pub async fn open_session(
    retailer: &str,
    probe_url: Option<&Url>,
    profiles: &[ClientProfile],
    options: &SessionOptions,
    cache: &mut ProfileCache,
) -> Result<HttpSession, SweepError> {
    let candidates = candidate_order(retailer, profiles, cache);
    let attempts = candidates.len();

    for profile in candidates {
        let client = match build_http_client(profile, options) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("{}: profile '{}' unusable: {}", retailer, profile.name, e);
                continue;
            }
        };

        if let Some(probe) = probe_url {
            match client.get(probe.clone()).send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    tracing::warn!(
                        "{}: profile '{}' probe returned HTTP {}",
                        retailer,
                        profile.name,
                        response.status().as_u16()
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!("{}: profile '{}' probe failed: {}", retailer, profile.name, e);
                    continue;
                }
            }
        }

        cache.remember(retailer, &profile.name);
        tracing::info!("{}: session opened with profile '{}'", retailer, profile.name);
        return Ok(HttpSession {
            retailer: retailer.to_string(),
            profile: profile.clone(),
            client,
        });
    }

    cache.forget(retailer);
    Err(SweepError::NoSession {
        retailer: retailer.to_string(),
        attempts,
    })
}
