//! Per-host request pacing
//!
//! Every request to a host reserves the next free slot for that host. Slots
//! are spaced by the effective delay (the larger of the configured minimum
//! and the robots.txt crawl delay) plus a random jitter, so concurrent
//! category crawls against one retailer queue up instead of bursting.

use crate::config::CrawlerConfig;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Upper bound on a robots.txt crawl delay (one hour)
const MAX_CRAWL_DELAY_SECS: f64 = 3600.0;

/// Spaces out requests per host
#[derive(Debug)]
pub struct HostPacer {
    min_interval: Duration,
    jitter: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    /// Creates a pacer
    ///
    /// # Arguments
    ///
    /// * `min_interval` - Minimum spacing between two requests to one host
    /// * `jitter` - Upper bound of the random extra spacing
    pub fn new(min_interval: Duration, jitter: Duration) -> Self {
        Self {
            min_interval,
            jitter,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a pacer from crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.minimum_time_on_page),
            Duration::from_millis(config.page_jitter),
        )
    }

    /// Calculates the spacing to apply after a request
    ///
    /// This takes the maximum of the configured minimum interval and the
    /// robots.txt crawl delay, if one was given. Crawl delays are capped
    /// at one hour.
    pub fn effective_delay(&self, crawl_delay: Option<f64>) -> Duration {
        let robots_delay = crawl_delay
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(|seconds| seconds.min(MAX_CRAWL_DELAY_SECS))
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
            .unwrap_or(Duration::ZERO);

        std::cmp::max(self.min_interval, robots_delay)
    }

    fn sample_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        self.jitter.mul_f64(rand::random::<f64>())
    }

    /// Waits until the host may be requested again
    ///
    /// The first request to a host goes out immediately. Returns how long
    /// the caller was held back.
    pub async fn wait_turn(&self, host: &str, crawl_delay: Option<f64>) -> Duration {
        let now = Instant::now();
        let slot = {
            let mut slots = self.next_slot.lock().await;
            let slot = slots
                .get(host)
                .copied()
                .filter(|slot| *slot > now)
                .unwrap_or(now);
            let spacing = self
                .effective_delay(crawl_delay)
                .saturating_add(self.sample_jitter());
            let next = slot.checked_add(spacing).unwrap_or(slot);
            slots.insert(host.to_string(), next);
            slot
        };

        let wait = slot.saturating_duration_since(now);
        if !wait.is_zero() {
            tracing::trace!("Pacing {}: waiting {:?}", host, wait);
            tokio::time::sleep_until(slot).await;
        }
        wait
    }
}
