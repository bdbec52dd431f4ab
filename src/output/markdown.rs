//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a sweep,
//! including per-retailer results, per-category outcomes, and low-yield
//! categories worth a second look.

use crate::output::summary::{OutputResult, RunSummary};
use crate::state::TerminalCause;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary to a file
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
///
/// # Arguments
///
/// * `summary` - The run summary data
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Aisle-Sweep Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Retailers Completed**: {} / {}\n",
        summary.completed_retailers(),
        summary.retailers.len()
    ));
    md.push_str(&format!(
        "- **Categories Crawled**: {}\n",
        summary.total_categories()
    ));
    md.push_str(&format!(
        "- **Categories Exhausted**: {} ({:.1}%)\n",
        summary.exhausted_categories(),
        summary.exhaustion_rate()
    ));
    if summary.aborted_categories() > 0 {
        md.push_str(&format!(
            "- **Categories Aborted**: {}\n",
            summary.aborted_categories()
        ));
    }
    md.push_str(&format!("- **Products**: {}\n\n", summary.total_products));

    // Retailers
    if !summary.retailers.is_empty() {
        md.push_str("## Retailers\n\n");
        md.push_str("| Retailer | Status | Profile | Categories | Products | Error |\n");
        md.push_str("|----------|--------|---------|------------|----------|-------|\n");

        for retailer in &summary.retailers {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                retailer.retailer,
                retailer.status.to_db_string(),
                retailer.profile.as_deref().unwrap_or("-"),
                retailer.categories,
                retailer.products,
                retailer.error_message.as_deref().unwrap_or("")
            ));
        }
        md.push_str("\n");
    }

    // Categories
    if !summary.categories.is_empty() {
        md.push_str("## Categories\n\n");
        md.push_str("| Retailer | Category | Stopped | Pages | Seen | Accepted | Duplicates | Failures |\n");
        md.push_str("|----------|----------|---------|-------|------|----------|------------|----------|\n");

        for category in &summary.categories {
            let stopped = match category.cause {
                Some(cause) => cause.to_string(),
                None => "aborted".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                category.retailer,
                category.category,
                stopped,
                category.pages_visited,
                category.items_seen,
                category.items_accepted,
                category.duplicates,
                category.extraction_failures
            ));
        }
        md.push_str("\n");
    }

    // Terminal causes
    if !summary.cause_breakdown.is_empty() {
        md.push_str("## Terminal Causes\n\n");
        md.push_str("| Cause | Categories |\n");
        md.push_str("|-------|------------|\n");

        for cause in TerminalCause::all() {
            if let Some(count) = summary.cause_breakdown.get(&cause) {
                md.push_str(&format!("| {} | {} |\n", cause, count));
            }
        }
        md.push_str("\n");
    }

    // Low-yield categories
    if !summary.low_yield.is_empty() {
        md.push_str("## Low-Yield Categories\n\n");
        md.push_str(&format!(
            "Categories with fewer than {} accepted items:\n\n",
            summary.low_yield_threshold
        ));
        for category in &summary.low_yield {
            md.push_str(&format!(
                "- {} / {}: {} items ({})\n",
                category.retailer, category.category, category.items_accepted, category.url
            ));
        }
        md.push_str("\n");
    }

    md
}
