//! Sweep coordinator - top-level orchestration
//!
//! This module drives a whole sweep:
//! - Creating the run record
//! - Opening a session per retailer and crawling its categories concurrently
//! - Bounding each retailer by its timeout
//! - Persisting category outcomes and merged products
//! - Writing the final summary

use crate::catalog::{CategorySource, IdentityPolicy, ItemIdentity, RawItemRecord};
use crate::config::Config;
use crate::crawler::extractor::CssItemExtractor;
use crate::crawler::fetcher::{HttpPageFetcher, PageProbes};
use crate::crawler::pacing::HostPacer;
use crate::crawler::policy::TerminationPolicy;
use crate::crawler::session::{open_session, ClientProfile, ProfileCache, SessionOptions};
use crate::crawler::traverse::{CrawlReport, PaginatedCatalogCrawler};
use crate::output::{generate_markdown_summary, generate_summary, RunSummary};
use crate::retailers::{resolve_retailer, RetailerPlan};
use crate::robots::RobotsCache;
use crate::storage::{CategoryCrawlRecord, RetailerStatus, RunStatus, SqliteStorage, Storage};
use crate::{ConfigError, SweepError};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A category crawl that ran to completion, successfully or not
struct CategoryOutcome {
    index: usize,
    source: CategorySource,
    started_at: DateTime<Utc>,
    result: Result<CrawlReport, ConfigError>,
}

/// What came back from one retailer's category crawls
struct CategoryBatch {
    outcomes: Vec<CategoryOutcome>,
    /// Categories that never finished, with the reason
    unfinished: Vec<(CategorySource, String)>,
    timed_out: bool,
}

/// Main sweep coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: SqliteStorage,
    crawler: PaginatedCatalogCrawler,
    profiles: Vec<ClientProfile>,
    options: SessionOptions,
    pacer: Arc<HostPacer>,
    robots: Option<Arc<RobotsCache>>,
    profile_cache: ProfileCache,
    run_id: i64,
}

impl Coordinator {
    /// Creates a new coordinator and its run record
    ///
    /// # Arguments
    ///
    /// * `config` - The validated sweep configuration
    /// * `config_hash` - Hash of the configuration file, stored with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Storage opened and run created
    /// * `Err(SweepError)` - Failed to initialize
    pub fn new(config: Config, config_hash: &str) -> Result<Self, SweepError> {
        let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let run_id = storage.create_run(config_hash)?;

        let robots = if config.crawler.respect_robots {
            Some(Arc::new(RobotsCache::new()))
        } else {
            tracing::warn!("robots.txt checks are disabled");
            None
        };

        Ok(Self {
            crawler: PaginatedCatalogCrawler::new(TerminationPolicy::from_config(&config.crawler)),
            profiles: config.client_profiles.iter().map(ClientProfile::from).collect(),
            options: SessionOptions::from_config(&config.crawler),
            pacer: Arc::new(HostPacer::from_config(&config.crawler)),
            robots,
            profile_cache: ProfileCache::new(),
            config: Arc::new(config),
            storage,
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Working client profile per retailer, as learned so far
    pub fn profile_cache(&self) -> &ProfileCache {
        &self.profile_cache
    }

    /// Runs the sweep over the selected retailers
    ///
    /// Retailers are crawled one after another. A retailer that cannot open
    /// a session or runs out of time does not stop the sweep.
    ///
    /// # Arguments
    ///
    /// * `retailer_filter` - Names of retailers to crawl; empty means all
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The sweep finished and the summary was written
    /// * `Err(SweepError)` - Storage or output failed; the run is marked failed
    pub async fn run(&mut self, retailer_filter: &[String]) -> Result<RunSummary, SweepError> {
        tracing::info!("Starting sweep run {}", self.run_id);
        let start_time = std::time::Instant::now();

        if let Err(e) = self.sweep(retailer_filter).await {
            tracing::error!("Sweep run {} failed: {}", self.run_id, e);
            self.storage.update_run_status(self.run_id, RunStatus::Failed)?;
            return Err(e);
        }

        self.storage.complete_run(self.run_id)?;

        let threshold = self.config.output.low_yield_threshold as u64;
        let summary = generate_summary(&self.storage, threshold)?;
        generate_markdown_summary(&summary, Path::new(&self.config.output.summary_path))?;

        tracing::info!(
            "Sweep completed: {} categories, {} products in {:?}",
            summary.total_categories(),
            summary.total_products,
            start_time.elapsed()
        );

        Ok(summary)
    }

    async fn sweep(&mut self, retailer_filter: &[String]) -> Result<(), SweepError> {
        let plans = select_retailers(&self.config, retailer_filter)?;
        for plan in plans {
            self.sweep_retailer(plan).await?;
        }
        Ok(())
    }

    /// Crawls every category of one retailer and stores the results
    async fn sweep_retailer(&mut self, plan: RetailerPlan) -> Result<(), SweepError> {
        tracing::info!(
            "{}: crawling {} categories (timeout {:?})",
            plan.name,
            plan.categories.len(),
            plan.timeout
        );
        if !plan.selectors.has_end_marker() {
            tracing::debug!(
                "{}: no next-page selectors, relying on empty-page and overlap checks",
                plan.name
            );
        }
        let retailer_run = self.storage.start_retailer(self.run_id, &plan.name)?;

        let session = match open_session(
            &plan.name,
            plan.probe_url.as_ref(),
            &self.profiles,
            &self.options,
            &mut self.profile_cache,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("{}: {}", plan.name, e);
                self.storage.finish_retailer(
                    retailer_run,
                    RetailerStatus::NoSession,
                    None,
                    0,
                    0,
                    Some(&e.to_string()),
                )?;
                return Ok(());
            }
        };
        let profile = session.profile().name.clone();

        let components = CssItemExtractor::new(&plan.selectors).and_then(|extractor| {
            PageProbes::new(&plan.selectors).map(|probes| (extractor, probes))
        });
        let (extractor, probes) = match components {
            Ok(components) => components,
            Err(e) => {
                tracing::error!("{}: {}", plan.name, e);
                self.storage.finish_retailer(
                    retailer_run,
                    RetailerStatus::Failed,
                    Some(&profile),
                    0,
                    0,
                    Some(&e.to_string()),
                )?;
                return Ok(());
            }
        };

        let fetcher = Arc::new(HttpPageFetcher::new(
            session,
            Arc::clone(&self.pacer),
            self.robots.clone(),
            probes,
        ));
        let batch = self
            .crawl_categories(&plan, fetcher, Arc::new(extractor))
            .await;

        // Persist every outcome before merging
        let mut reports = Vec::new();
        for outcome in batch.outcomes {
            let record = self.outcome_record(&outcome);
            self.storage.insert_category_crawl(&record)?;
            if let Ok(report) = outcome.result {
                reports.push(report);
            }
        }
        let now = Utc::now().to_rfc3339();
        for (source, reason) in &batch.unfinished {
            self.storage.insert_category_crawl(&CategoryCrawlRecord {
                id: 0,
                run_id: self.run_id,
                retailer: source.retailer.clone(),
                category: source.label.clone(),
                url: source.locator.to_string(),
                cause: None,
                pages_visited: 0,
                items_seen: 0,
                items_accepted: 0,
                duplicates: 0,
                extraction_failures: 0,
                error_message: Some(reason.clone()),
                started_at: now.clone(),
                finished_at: now.clone(),
            })?;
        }

        let merged = merge_category_results(
            &reports,
            self.crawler.policy().identity,
            self.config.output.dedupe_across_categories,
        );
        let products = self.storage.insert_products(self.run_id, &plan.name, &merged)?;

        let (status, error) = if batch.timed_out {
            (
                RetailerStatus::TimedOut,
                Some(format!(
                    "timed out after {:?}; {} categories unfinished",
                    plan.timeout,
                    batch.unfinished.len()
                )),
            )
        } else {
            (RetailerStatus::Completed, None)
        };
        self.storage.finish_retailer(
            retailer_run,
            status,
            Some(&profile),
            reports.len() as u32,
            products,
            error.as_deref(),
        )?;

        tracing::info!(
            "{}: {} ({} categories, {} products)",
            plan.name,
            status.to_db_string(),
            reports.len(),
            products
        );
        Ok(())
    }

    /// Crawls a retailer's categories concurrently under its timeout
    ///
    /// On timeout, in-flight crawls are aborted and finished ones are kept.
    async fn crawl_categories(
        &self,
        plan: &RetailerPlan,
        fetcher: Arc<HttpPageFetcher>,
        extractor: Arc<CssItemExtractor>,
    ) -> CategoryBatch {
        let limit = self.config.crawler.max_concurrent_categories.max(1) as usize;
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();

        for (index, source) in plan.categories.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&fetcher);
            let extractor = Arc::clone(&extractor);
            let crawler = self.crawler;

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let started_at = Utc::now();
                let result = crawler
                    .crawl(&source, fetcher.as_ref(), extractor.as_ref())
                    .await;
                CategoryOutcome {
                    index,
                    source,
                    started_at,
                    result,
                }
            });
        }

        let deadline = tokio::time::Instant::now() + plan.timeout;
        let mut outcomes = Vec::new();
        let mut timed_out = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(outcome))) => {
                    let threshold = self.config.output.low_yield_threshold;
                    if let Ok(report) = &outcome.result {
                        if report.accepted() < threshold {
                            tracing::warn!(
                                "{}/{}: low yield, {} items accepted ({})",
                                report.retailer,
                                report.category,
                                report.accepted(),
                                outcome.source.locator
                            );
                        }
                    }
                    outcomes.push(outcome);
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("{}: category task failed: {}", plan.name, e);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "{}: timed out after {:?}, aborting {} category crawl(s)",
                        plan.name,
                        plan.timeout,
                        tasks.len()
                    );
                    tasks.abort_all();
                    timed_out = true;
                    break;
                }
            }
        }

        outcomes.sort_by_key(|outcome| outcome.index);
        let finished: HashSet<usize> = outcomes.iter().map(|o| o.index).collect();
        let reason = if timed_out {
            "aborted: retailer timeout"
        } else {
            "aborted: category task failed"
        };
        let unfinished = plan
            .categories
            .iter()
            .enumerate()
            .filter(|(index, _)| !finished.contains(index))
            .map(|(_, source)| (source.clone(), reason.to_string()))
            .collect();

        CategoryBatch {
            outcomes,
            unfinished,
            timed_out,
        }
    }

    fn outcome_record(&self, outcome: &CategoryOutcome) -> CategoryCrawlRecord {
        let mut record = CategoryCrawlRecord {
            id: 0,
            run_id: self.run_id,
            retailer: outcome.source.retailer.clone(),
            category: outcome.source.label.clone(),
            url: outcome.source.locator.to_string(),
            cause: None,
            pages_visited: 0,
            items_seen: 0,
            items_accepted: 0,
            duplicates: 0,
            extraction_failures: 0,
            error_message: None,
            started_at: outcome.started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
        };

        match &outcome.result {
            Ok(report) => {
                record.cause = Some(report.cause);
                record.pages_visited = report.pages_visited;
                record.items_seen = report.items_seen as u64;
                record.items_accepted = report.accepted() as u64;
                record.duplicates = report.duplicates as u64;
                record.extraction_failures = report.extraction_failures as u64;
                record.error_message = report.last_fetch_error.clone();
            }
            Err(e) => record.error_message = Some(e.to_string()),
        }
        record
    }
}

/// Resolves the retailers to crawl, in configured order
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `filter` - Retailer names (case-insensitive); empty selects all
///
/// # Returns
///
/// * `Ok(Vec<RetailerPlan>)` - The selected retailers
/// * `Err(SweepError::UnknownRetailer)` - A filter name matches no retailer
pub fn select_retailers(
    config: &Config,
    filter: &[String],
) -> Result<Vec<RetailerPlan>, SweepError> {
    for name in filter {
        if !config
            .retailers
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(name))
        {
            return Err(SweepError::UnknownRetailer(name.clone()));
        }
    }

    config
        .retailers
        .iter()
        .filter(|r| filter.is_empty() || filter.iter().any(|f| f.eq_ignore_ascii_case(&r.name)))
        .map(|r| resolve_retailer(r, config.crawler.https_only).map_err(SweepError::from))
        .collect()
}

/// Merges the category results of one retailer
///
/// Reports are taken in the given order. With `dedupe_across` set, an item
/// already accepted under an earlier category is dropped. The result is
/// sorted by category, then name; ties keep discovery order.
///
/// # Arguments
///
/// * `reports` - Finished category crawls, in configured category order
/// * `identity` - How items are identified across categories
/// * `dedupe_across` - Whether duplicates across categories are removed
pub fn merge_category_results(
    reports: &[CrawlReport],
    identity: IdentityPolicy,
    dedupe_across: bool,
) -> Vec<RawItemRecord> {
    let mut seen = HashSet::new();
    let mut merged: Vec<RawItemRecord> = reports
        .iter()
        .flat_map(|report| report.records.iter())
        .filter(|record| !dedupe_across || seen.insert(ItemIdentity::of(record, identity)))
        .cloned()
        .collect();

    merged.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.name.cmp(&b.name))
    });
    merged
}

/// Runs a complete sweep
///
/// # Arguments
///
/// * `config` - The validated sweep configuration
/// * `config_hash` - Hash of the configuration file
/// * `retailer_filter` - Retailers to crawl; empty means all
///
/// # Returns
///
/// * `Ok(RunSummary)` - Sweep completed
/// * `Err(SweepError)` - Sweep failed with an error
///
/// # Example
///
/// ```no_run
/// use aisle_sweep::config::load_config_with_hash;
/// use aisle_sweep::crawler::run_sweep;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let summary = run_sweep(config, &hash, &[]).await?;
/// println!("{} products", summary.total_products);
/// # Ok(())
/// # }
/// ```
pub async fn run_sweep(
    config: Config,
    config_hash: &str,
    retailer_filter: &[String],
) -> Result<RunSummary, SweepError> {
    let mut coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run(retailer_filter).await
}
