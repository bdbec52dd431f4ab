use crate::catalog::IdentityPolicy;
use serde::Deserialize;

/// Main configuration structure for Aisle-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(rename = "client-profile", default)]
    pub client_profiles: Vec<ClientProfileConfig>,
    #[serde(rename = "retailer", default)]
    pub retailers: Vec<RetailerConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Hard ceiling on pages fetched per category
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Consecutive pages without a new item that end a category
    #[serde(
        rename = "max-consecutive-empty-pages",
        default = "default_max_consecutive_empty_pages"
    )]
    pub max_consecutive_empty_pages: u32,

    /// Fraction of already-seen items on one page that ends a category
    #[serde(
        rename = "duplicate-overlap-threshold",
        default = "default_duplicate_overlap_threshold"
    )]
    pub duplicate_overlap_threshold: f64,

    /// Which record fields identify an item
    #[serde(default)]
    pub identity: IdentityPolicy,

    /// Maximum number of categories crawled at once per retailer
    #[serde(
        rename = "max-concurrent-categories",
        default = "default_max_concurrent_categories"
    )]
    pub max_concurrent_categories: u32,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(
        rename = "minimum-time-on-page",
        default = "default_minimum_time_on_page"
    )]
    pub minimum_time_on_page: u64,

    /// Upper bound of the random delay added to each wait (milliseconds)
    #[serde(rename = "page-jitter", default = "default_page_jitter")]
    pub page_jitter: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Whether robots.txt rules and crawl delays are honored
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Whether only HTTPS category URLs are accepted
    #[serde(rename = "https-only", default = "default_true")]
    pub https_only: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,

    /// Categories yielding fewer accepted items than this are flagged
    #[serde(
        rename = "low-yield-threshold",
        default = "default_low_yield_threshold"
    )]
    pub low_yield_threshold: usize,

    /// Whether an item listed under several categories is kept only once
    #[serde(rename = "dedupe-across-categories", default = "default_true")]
    pub dedupe_across_categories: bool,
}

/// One HTTP client identity tried when opening a retailer session
#[derive(Debug, Clone, Deserialize)]
pub struct ClientProfileConfig {
    /// Name used in logs and run records
    pub name: String,

    /// User-Agent header value
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Accept-Language header value
    #[serde(rename = "accept-language", default)]
    pub accept_language: Option<String>,
}

/// One retailer and the categories to crawl on it
#[derive(Debug, Clone, Deserialize)]
pub struct RetailerConfig {
    /// Retailer name (unique within the config)
    pub name: String,

    /// Built-in selector and paging preset to start from
    #[serde(default)]
    pub preset: Option<String>,

    /// URL requested to confirm a client profile works
    #[serde(rename = "probe-url", default)]
    pub probe_url: Option<String>,

    /// Wall-clock budget for all of this retailer's categories (minutes)
    #[serde(rename = "timeout-minutes", default = "default_timeout_minutes")]
    pub timeout_minutes: u64,

    /// Page numbering override
    #[serde(default)]
    pub paging: Option<PagingConfig>,

    /// Selector overrides applied on top of the preset
    #[serde(default)]
    pub selectors: Option<SelectorOverrides>,

    /// Categories to crawl
    #[serde(rename = "category", default)]
    pub categories: Vec<CategoryConfig>,
}

/// Page numbering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagingStyle {
    Query,
    Path,
}

/// Page numbering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
    pub style: PagingStyle,

    /// Query parameter name (query style, defaults to "page")
    #[serde(default)]
    pub param: Option<String>,

    /// Path suffix containing `{page}` (path style)
    #[serde(default)]
    pub template: Option<String>,

    /// Whether page 1 is requested without numbering
    #[serde(rename = "first-page-bare", default)]
    pub first_page_bare: Option<bool>,
}

/// Selector overrides; any list given replaces the preset's list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorOverrides {
    #[serde(default)]
    pub item: Option<Vec<String>>,
    #[serde(default)]
    pub name: Option<Vec<String>>,
    #[serde(default)]
    pub brand: Option<Vec<String>>,
    #[serde(default)]
    pub price: Option<Vec<String>>,
    #[serde(rename = "secondary-price", default)]
    pub secondary_price: Option<Vec<String>>,
    #[serde(rename = "price-pattern", default)]
    pub price_pattern: Option<String>,
    #[serde(rename = "wait-for", default)]
    pub wait_for: Option<Vec<String>>,
    #[serde(rename = "next-enabled", default)]
    pub next_enabled: Option<Vec<String>>,
    #[serde(rename = "next-disabled", default)]
    pub next_disabled: Option<Vec<String>>,
}

/// One category listing
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    /// URL of the first page of the listing
    pub url: String,

    /// Display label; derived from the URL when absent
    #[serde(default)]
    pub label: Option<String>,
}

fn default_max_pages() -> u32 {
    50
}

fn default_max_consecutive_empty_pages() -> u32 {
    3
}

fn default_duplicate_overlap_threshold() -> f64 {
    0.9
}

fn default_max_concurrent_categories() -> u32 {
    3
}

fn default_minimum_time_on_page() -> u64 {
    1000
}

fn default_page_jitter() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    20
}

fn default_low_yield_threshold() -> usize {
    5
}

fn default_timeout_minutes() -> u64 {
    45
}

fn default_true() -> bool {
    true
}
