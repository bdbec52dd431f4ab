//! Crawler module for paginated category listings
//!
//! This module contains the core crawling logic, including:
//! - The page-by-page crawl loop and its termination policy
//! - The fetcher and extractor contracts with their HTTP and CSS implementations
//! - Client profile sessions and per-host pacing
//! - Overall sweep coordination

mod coordinator;
mod extractor;
mod fetcher;
mod pacing;
mod policy;
mod session;
mod traverse;

pub use coordinator::{merge_category_results, run_sweep, select_retailers, Coordinator};
pub use extractor::{CssItemExtractor, ExtractError, ExtractedItems, ItemExtractor};
pub use fetcher::{FetchFailure, HttpPageFetcher, PageFetcher, PageHandle, PageProbes, ProbeOutcome};
pub use pacing::HostPacer;
pub use policy::TerminationPolicy;
pub use session::{
    build_http_client, open_session, ClientProfile, HttpSession, ProfileCache, SessionOptions,
};
pub use traverse::{crawl, CrawlReport, PaginatedCatalogCrawler};
