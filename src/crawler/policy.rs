use crate::catalog::IdentityPolicy;
use crate::config::CrawlerConfig;
use crate::ConfigError;

/// When a category crawl should stop, and how items are identified
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationPolicy {
    /// Hard ceiling on pages fetched; guarantees termination
    pub max_pages: u32,

    /// Consecutive pages with no new identity that end the crawl
    pub max_consecutive_empty_pages: u32,

    /// A page whose duplicate fraction exceeds this ends the crawl
    pub duplicate_overlap_threshold: f64,

    /// Which record fields identify an item
    pub identity: IdentityPolicy,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_consecutive_empty_pages: 3,
            duplicate_overlap_threshold: 0.9,
            identity: IdentityPolicy::default(),
        }
    }
}

impl TerminationPolicy {
    /// Takes the policy fields from crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_consecutive_empty_pages: config.max_consecutive_empty_pages,
            duplicate_overlap_threshold: config.duplicate_overlap_threshold,
            identity: config.identity,
        }
    }

    /// Checks the policy before any page is fetched
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages < 1 {
            return Err(ConfigError::Validation(format!(
                "max_pages must be >= 1, got {}",
                self.max_pages
            )));
        }

        if self.max_consecutive_empty_pages < 1 {
            return Err(ConfigError::Validation(format!(
                "max_consecutive_empty_pages must be >= 1, got {}",
                self.max_consecutive_empty_pages
            )));
        }

        // NaN fails both comparisons
        let threshold = self.duplicate_overlap_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "duplicate_overlap_threshold must be in (0, 1], got {}",
                threshold
            )));
        }

        Ok(())
    }
}
