//! Aisle-Sweep main entry point
//!
//! This is the command-line interface for the Aisle-Sweep grocery catalog crawler.

use aisle_sweep::config::{load_config_with_hash, Config};
use aisle_sweep::crawler::{run_sweep, select_retailers};
use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Aisle-Sweep: a paginated grocery catalog crawler
///
/// Aisle-Sweep walks the category listings of online grocery retailers page
/// by page, extracts product names and prices, removes duplicates, and
/// stores the merged catalog in SQLite.
#[derive(Parser, Debug)]
#[command(name = "aisle-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A paginated grocery catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Only crawl the named retailer (repeatable)
    #[arg(long = "retailer", value_name = "NAME")]
    retailers: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.retailers)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else {
        handle_sweep(config, &config_hash, &cli.retailers).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("aisle_sweep=info,warn"),
            1 => EnvFilter::new("aisle_sweep=debug,info"),
            2 => EnvFilter::new("aisle_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, retailer_filter: &[String]) -> anyhow::Result<()> {
    let plans = select_retailers(config, retailer_filter)?;

    println!("=== Aisle-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages per category: {}", config.crawler.max_pages);
    println!(
        "  Max consecutive empty pages: {}",
        config.crawler.max_consecutive_empty_pages
    );
    println!(
        "  Duplicate overlap threshold: {}",
        config.crawler.duplicate_overlap_threshold
    );
    println!("  Identity: {}", config.crawler.identity);
    println!(
        "  Max concurrent categories: {}",
        config.crawler.max_concurrent_categories
    );
    println!(
        "  Minimum time on page: {}ms (+ up to {}ms jitter)",
        config.crawler.minimum_time_on_page, config.crawler.page_jitter
    );
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);

    println!("\nClient Profiles ({}):", config.client_profiles.len());
    for profile in &config.client_profiles {
        println!("  - {}: {}", profile.name, profile.user_agent);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nRetailers ({}):", plans.len());
    for plan in &plans {
        println!(
            "  - {} ({} paging, timeout {} min, {} categories)",
            plan.name,
            plan.numbering.style(),
            plan.timeout.as_secs() / 60,
            plan.categories.len()
        );
        for category in &plan.categories {
            println!("    * {}: {}", category.label, category.locator);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} categories",
        plans.iter().map(|p| p.categories.len()).sum::<usize>()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use aisle_sweep::output::{load_statistics, print_statistics};
    use aisle_sweep::storage::open_storage;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    use aisle_sweep::output::{generate_markdown_summary, generate_summary};
    use aisle_sweep::storage::open_storage;

    println!("=== Exporting Sweep Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let storage = open_storage(Path::new(&config.output.database_path))?;

    tracing::info!("Loading sweep data from database...");
    let summary = generate_summary(&storage, config.output.low_yield_threshold as u64)?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

/// Handles the main sweep operation
async fn handle_sweep(
    config: Config,
    config_hash: &str,
    retailer_filter: &[String],
) -> anyhow::Result<()> {
    tracing::info!(
        "Retailers: {}, client profiles: {}",
        config.retailers.len(),
        config.client_profiles.len()
    );

    let summary_path = config.output.summary_path.clone();
    let summary = run_sweep(config, config_hash, retailer_filter)
        .await
        .context("Sweep failed")?;

    tracing::info!(
        "Sweep completed: {} / {} retailers, {} categories, {} products; summary at {}",
        summary.completed_retailers(),
        summary.retailers.len(),
        summary.total_categories(),
        summary.total_products,
        summary_path
    );

    Ok(())
}
