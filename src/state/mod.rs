//! State module for tracking category crawl progress
//!
//! # Components
//!
//! - `CrawlState`: identity set, accepted records and streak counters of one crawl
//! - `CrawlPhase`: where a crawl is in its fetch/extract/evaluate cycle
//! - `TerminalCause`: why a crawl stopped

mod crawl_state;
mod phase;

// Re-export main types
pub use crawl_state::{CrawlState, PageTally};
pub use phase::{CrawlPhase, TerminalCause};
