//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::catalog::RawItemRecord;
use crate::state::TerminalCause;
use crate::storage::{
    CategoryCrawlRecord, ProductRecord, RetailerRunRecord, RetailerStatus, RunRecord, RunStatus,
};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Retailer run not found: {0}")]
    RetailerRunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the coordinator and
/// the summary output.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new sweep run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Retailer Runs =====

    /// Records that a retailer's crawl has started
    ///
    /// # Returns
    ///
    /// The ID of the retailer run row
    fn start_retailer(&mut self, run_id: i64, retailer: &str) -> StorageResult<i64>;

    /// Records how a retailer's crawl ended
    ///
    /// # Arguments
    ///
    /// * `id` - The retailer run ID returned by `start_retailer`
    /// * `status` - Final status
    /// * `profile` - Client profile the session used, if one opened
    /// * `categories` - Categories that produced an outcome
    /// * `products` - Products stored after the merge
    /// * `error_message` - Why the retailer did not complete, if it didn't
    fn finish_retailer(
        &mut self,
        id: i64,
        status: RetailerStatus,
        profile: Option<&str>,
        categories: u32,
        products: u64,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets every retailer of a run, in start order
    fn get_retailer_runs(&self, run_id: i64) -> StorageResult<Vec<RetailerRunRecord>>;

    // ===== Category Crawls =====

    /// Stores the outcome of one category crawl
    ///
    /// The record's `id` is ignored; the new row ID is returned.
    fn insert_category_crawl(&mut self, record: &CategoryCrawlRecord) -> StorageResult<i64>;

    /// Gets every category crawl of a run, ordered by retailer then category
    fn get_category_crawls(&self, run_id: i64) -> StorageResult<Vec<CategoryCrawlRecord>>;

    /// Counts finished category crawls per terminal cause
    fn get_cause_breakdown(&self, run_id: i64) -> StorageResult<HashMap<TerminalCause, u64>>;

    /// Gets category crawls that accepted fewer than `threshold` items
    fn get_low_yield_categories(
        &self,
        run_id: i64,
        threshold: u64,
    ) -> StorageResult<Vec<CategoryCrawlRecord>>;

    // ===== Products =====

    /// Stores a retailer's merged products in the given order
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn insert_products(
        &mut self,
        run_id: i64,
        retailer: &str,
        products: &[RawItemRecord],
    ) -> StorageResult<u64>;

    /// Gets a retailer's products in stored order
    fn get_products(&self, run_id: i64, retailer: &str) -> StorageResult<Vec<ProductRecord>>;

    /// Counts products stored for a run
    fn count_products(&self, run_id: i64) -> StorageResult<u64>;
}
