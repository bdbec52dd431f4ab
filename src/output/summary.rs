//! Run summary types
//!
//! This module defines the summary data rendered by the markdown output and
//! the output error type.

use crate::state::TerminalCause;
use crate::storage::{CategoryCrawlRecord, RetailerRunRecord, RetailerStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary of one sweep run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    // Run metadata
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: String,

    /// Retailers in the order they were crawled
    pub retailers: Vec<RetailerRunRecord>,

    /// Category outcomes, ordered by retailer then category
    pub categories: Vec<CategoryCrawlRecord>,

    /// Finished categories per terminal cause
    pub cause_breakdown: HashMap<TerminalCause, u64>,

    /// Accepted-item count below which a category is flagged
    pub low_yield_threshold: u64,

    /// Categories that accepted fewer than `low_yield_threshold` items
    pub low_yield: Vec<CategoryCrawlRecord>,

    pub total_products: u64,
}

impl RunSummary {
    /// Creates a new empty run summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of categories with an outcome
    pub fn total_categories(&self) -> usize {
        self.categories.len()
    }

    /// Returns the number of categories read to the end of their listing
    pub fn exhausted_categories(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| c.cause.map_or(false, |cause| cause.is_exhausted()))
            .count()
    }

    /// Returns the number of categories that never finished
    pub fn aborted_categories(&self) -> usize {
        self.categories.iter().filter(|c| c.cause.is_none()).count()
    }

    /// Returns the number of retailers that completed
    pub fn completed_retailers(&self) -> usize {
        self.retailers
            .iter()
            .filter(|r| r.status == RetailerStatus::Completed)
            .count()
    }

    /// Returns the share of categories read to the end, as a percentage
    pub fn exhaustion_rate(&self) -> f64 {
        let total = self.total_categories();
        if total == 0 {
            return 0.0;
        }
        (self.exhausted_categories() as f64 / total as f64) * 100.0
    }
}
