//! Statistics generation from the sweep database
//!
//! This module provides functionality for extracting and displaying
//! statistics of the latest run from the storage layer.

use crate::state::TerminalCause;
use crate::storage::{RetailerRunRecord, RunRecord, Storage};
use crate::SweepError;
use std::collections::HashMap;

/// Statistics of one run
#[derive(Debug, Clone)]
pub struct SweepStatistics {
    /// The run the statistics describe
    pub run: RunRecord,

    /// Retailers in crawl order
    pub retailers: Vec<RetailerRunRecord>,

    /// Number of category crawls recorded
    pub categories: u64,

    /// Finished categories per terminal cause
    pub cause_breakdown: HashMap<TerminalCause, u64>,

    /// Total accepted items before the cross-category merge
    pub items_accepted: u64,

    /// Total duplicates discarded within categories
    pub duplicates: u64,

    /// Products stored after the merge
    pub products: u64,
}

/// Loads statistics of the latest run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(SweepStatistics)` - Successfully loaded statistics
/// * `Err(SweepError)` - No run exists or the query failed
pub fn load_statistics(storage: &dyn Storage) -> Result<SweepStatistics, SweepError> {
    let run = storage
        .get_latest_run()?
        .ok_or_else(|| SweepError::Storage("No sweep runs found in database".to_string()))?;

    let retailers = storage.get_retailer_runs(run.id)?;
    let crawls = storage.get_category_crawls(run.id)?;
    let cause_breakdown = storage.get_cause_breakdown(run.id)?;
    let products = storage.count_products(run.id)?;

    Ok(SweepStatistics {
        categories: crawls.len() as u64,
        items_accepted: crawls.iter().map(|c| c.items_accepted).sum(),
        duplicates: crawls.iter().map(|c| c.duplicates).sum(),
        run,
        retailers,
        cause_breakdown,
        products,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &SweepStatistics) {
    println!("=== Sweep Statistics ===\n");

    println!("Run {} ({}):", stats.run.id, stats.run.status.to_db_string());
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Categories crawled: {}", stats.categories);
    println!("  Items accepted: {}", stats.items_accepted);
    println!("  Duplicates discarded: {}", stats.duplicates);
    println!("  Products stored: {}", stats.products);
    println!();

    if !stats.retailers.is_empty() {
        println!("Retailers:");
        for retailer in &stats.retailers {
            println!(
                "  {}: {} ({} categories, {} products)",
                retailer.retailer,
                retailer.status.to_db_string(),
                retailer.categories,
                retailer.products
            );
        }
        println!();
    }

    if !stats.cause_breakdown.is_empty() {
        println!("Terminal Causes:");
        let total: u64 = stats.cause_breakdown.values().sum();
        for cause in TerminalCause::all() {
            let Some(count) = stats.cause_breakdown.get(&cause) else {
                continue;
            };
            let percentage = (*count as f64 / total as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", cause, count, percentage);
        }
        println!();
    }
}
