//! Output module for generating sweep summaries and reports
//!
//! This module handles:
//! - Building a summary of the latest run from storage
//! - Rendering the summary as markdown
//! - Printing run statistics

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, SweepStatistics};
pub use summary::{OutputError, OutputResult, RunSummary};

use crate::storage::Storage;
use crate::SweepError;

/// Generates a summary of the latest run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend containing sweep data
/// * `low_yield_threshold` - Categories accepting fewer items are listed
///
/// # Returns
///
/// * `Ok(RunSummary)` - Successfully generated summary
/// * `Err(SweepError)` - No run exists or a query failed
pub fn generate_summary(
    storage: &dyn Storage,
    low_yield_threshold: u64,
) -> Result<RunSummary, SweepError> {
    let run = storage
        .get_latest_run()?
        .ok_or_else(|| SweepError::Storage("No sweep runs found in database".to_string()))?;

    let duration_seconds = match (
        run.started_at.parse::<chrono::DateTime<chrono::Utc>>(),
        run.finished_at
            .as_deref()
            .map(|f| f.parse::<chrono::DateTime<chrono::Utc>>()),
    ) {
        (Ok(started), Some(Ok(finished))) => Some((finished - started).num_seconds().max(0) as u64),
        _ => None,
    };

    Ok(RunSummary {
        run_id: run.id,
        started_at: run.started_at,
        finished_at: run.finished_at,
        duration_seconds,
        status: run.status.to_db_string().to_string(),
        config_hash: run.config_hash,
        retailers: storage.get_retailer_runs(run.id)?,
        categories: storage.get_category_crawls(run.id)?,
        cause_breakdown: storage.get_cause_breakdown(run.id)?,
        low_yield_threshold,
        low_yield: storage.get_low_yield_categories(run.id, low_yield_threshold)?,
        total_products: storage.count_products(run.id)?,
    })
}
