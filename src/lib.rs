//! Aisle-Sweep: a paginated grocery catalog crawler
//!
//! This crate walks the category listings of online grocery retailers page by
//! page, extracts product names and prices, removes duplicates, and decides
//! when a listing has been exhausted.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod retailers;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Aisle-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("No working client profile for {retailer} after {attempts} attempt(s)")]
    NoSession { retailer: String, attempts: usize },

    #[error("Unknown retailer: {0}")]
    UnknownRetailer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid price pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

// Re-export commonly used types
pub use catalog::{CategorySource, IdentityPolicy, ItemIdentity, PageNumbering, RawItemRecord};
pub use config::Config;
pub use crawler::{
    crawl, CrawlReport, ItemExtractor, PageFetcher, PageHandle, PaginatedCatalogCrawler,
    TerminationPolicy,
};
pub use state::{CrawlPhase, TerminalCause};
