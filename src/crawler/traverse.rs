//! The paginated crawl loop
//!
//! One call crawls one category: pages are fetched in order starting at 1,
//! their items deduplicated by identity, and the termination checks applied
//! after every page. The loop performs no retries and owns its state; the
//! only suspension point is the fetcher.

use crate::catalog::{CategorySource, RawItemRecord};
use crate::crawler::extractor::ItemExtractor;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::policy::TerminationPolicy;
use crate::state::{CrawlPhase, CrawlState, PageTally, TerminalCause};
use crate::ConfigError;

/// Outcome of one category crawl
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub retailer: String,
    pub category: String,

    /// Accepted records in discovery order
    pub records: Vec<RawItemRecord>,

    pub cause: TerminalCause,
    pub pages_visited: u32,
    pub items_seen: usize,
    pub duplicates: usize,
    pub extraction_failures: usize,

    /// Most recent fetch failure, soft or hard
    pub last_fetch_error: Option<String>,
}

impl CrawlReport {
    /// Number of records accepted
    pub fn accepted(&self) -> usize {
        self.records.len()
    }

    /// Consumes the report, returning the records
    pub fn into_records(self) -> Vec<RawItemRecord> {
        self.records
    }
}

/// Crawls paginated category listings under a termination policy
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginatedCatalogCrawler {
    policy: TerminationPolicy,
}

impl PaginatedCatalogCrawler {
    pub fn new(policy: TerminationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TerminationPolicy {
        &self.policy
    }

    /// Crawls one category to exhaustion or the page ceiling
    ///
    /// # Arguments
    ///
    /// * `source` - The category listing to walk
    /// * `fetcher` - Retrieves pages; its failures end or pause the crawl
    /// * `extractor` - Turns pages into records
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Accepted records and counters; partial when the
    ///   cause is `FetchFailed`
    /// * `Err(ConfigError)` - The policy or the source is invalid; nothing
    ///   was fetched
    pub async fn crawl(
        &self,
        source: &CategorySource,
        fetcher: &dyn PageFetcher,
        extractor: &dyn ItemExtractor,
    ) -> Result<CrawlReport, ConfigError> {
        self.policy.validate()?;
        source.validate()?;

        let label = format!("{}/{}", source.retailer, source.label);
        let mut state = CrawlState::new(self.policy.identity);
        let mut phase = CrawlPhase::initial();
        let mut last_fetch_error = None;
        tracing::trace!("{}: {}", label, phase);

        let cause = loop {
            let page_index = state.page_index();
            let mut tally = PageTally::default();
            state.record_visit();

            let has_next_page = match fetcher.fetch(source, page_index).await {
                Ok(page) => {
                    enter(&label, &mut phase, CrawlPhase::Extracting(page_index));
                    for result in extractor.extract(&page, source) {
                        match result {
                            Ok(record) => {
                                state.admit(record, &mut tally);
                            }
                            Err(e) => {
                                tracing::debug!(
                                    "{}: page {}: skipped item: {}",
                                    label,
                                    page_index,
                                    e
                                );
                                state.reject(&mut tally);
                            }
                        }
                    }
                    page.has_next_page
                }
                Err(failure) if failure.is_soft() => {
                    tracing::warn!("{}: page {}: {}", label, page_index, failure);
                    last_fetch_error = Some(failure.to_string());
                    enter(&label, &mut phase, CrawlPhase::Extracting(page_index));
                    None
                }
                Err(failure) => {
                    tracing::warn!("{}: page {}: {}", label, page_index, failure);
                    last_fetch_error = Some(failure.to_string());
                    let cause = TerminalCause::FetchFailed;
                    enter(&label, &mut phase, CrawlPhase::Terminated(cause));
                    break cause;
                }
            };

            enter(&label, &mut phase, CrawlPhase::Evaluating(page_index));
            let streak = state.close_page(&tally);
            tracing::debug!(
                "{}: page {}: {} items, {} new, {} duplicates, streak {}",
                label,
                page_index,
                tally.items,
                tally.new_identities,
                tally.duplicates,
                streak
            );

            if let Some(cause) = self.evaluate(&tally, streak, has_next_page, page_index) {
                enter(&label, &mut phase, CrawlPhase::Terminated(cause));
                break cause;
            }

            let next = state.advance();
            enter(&label, &mut phase, CrawlPhase::Fetching(next));
        };

        tracing::info!(
            "{}: stopped after {} page(s): {} ({} items accepted)",
            label,
            state.pages_visited(),
            cause,
            state.accepted().len()
        );

        Ok(CrawlReport {
            retailer: source.retailer.clone(),
            category: source.label.clone(),
            cause,
            pages_visited: state.pages_visited(),
            items_seen: state.items_seen(),
            duplicates: state.duplicates(),
            extraction_failures: state.extraction_failures(),
            last_fetch_error,
            records: state.into_records(),
        })
    }

    /// Applies the termination checks to a finished page
    fn evaluate(
        &self,
        tally: &PageTally,
        streak: u32,
        has_next_page: Option<bool>,
        page_index: u32,
    ) -> Option<TerminalCause> {
        if streak >= self.policy.max_consecutive_empty_pages {
            return Some(TerminalCause::EmptyStreak);
        }
        if tally.overlap() > self.policy.duplicate_overlap_threshold {
            return Some(TerminalCause::DuplicateOverlap);
        }
        if has_next_page == Some(false) {
            return Some(TerminalCause::EndMarker);
        }
        if page_index >= self.policy.max_pages {
            return Some(TerminalCause::PageCeiling);
        }
        None
    }
}

fn enter(label: &str, phase: &mut CrawlPhase, next: CrawlPhase) {
    debug_assert!(
        phase.can_transition_to(&next),
        "illegal transition {} -> {}",
        phase,
        next
    );
    tracing::trace!("{}: {} -> {}", label, phase, next);
    *phase = next;
}

/// Crawls one category with a one-off crawler
///
/// See [`PaginatedCatalogCrawler::crawl`].
pub async fn crawl(
    source: &CategorySource,
    fetcher: &dyn PageFetcher,
    extractor: &dyn ItemExtractor,
    policy: TerminationPolicy,
) -> Result<CrawlReport, ConfigError> {
    PaginatedCatalogCrawler::new(policy)
        .crawl(source, fetcher, extractor)
        .await
}
