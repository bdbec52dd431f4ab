use crate::catalog::{IdentityPolicy, ItemIdentity, RawItemRecord};
use std::collections::HashSet;

/// Per-page counters gathered while a page is extracted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTally {
    /// Records extracted successfully from the page
    pub items: usize,

    /// Records whose identity had not been seen before
    pub new_identities: usize,

    /// Records whose identity had already been seen
    pub duplicates: usize,

    /// Items the extractor could not turn into records
    pub extraction_failures: usize,
}

impl PageTally {
    /// Fraction of the page's items that were already seen
    ///
    /// An empty page has no overlap.
    pub fn overlap(&self) -> f64 {
        if self.items == 0 {
            0.0
        } else {
            self.duplicates as f64 / self.items as f64
        }
    }
}

/// Mutable state of one category crawl
///
/// Owned by exactly one crawl. The identity set only grows, and it always
/// holds exactly one identity per accepted record.
#[derive(Debug, Clone)]
pub struct CrawlState {
    policy: IdentityPolicy,
    page_index: u32,
    seen: HashSet<ItemIdentity>,
    accepted: Vec<RawItemRecord>,
    empty_streak: u32,
    pages_visited: u32,
    items_seen: usize,
    duplicates: usize,
    extraction_failures: usize,
}

impl CrawlState {
    /// Creates the state of a crawl about to fetch page 1
    pub fn new(policy: IdentityPolicy) -> Self {
        Self {
            policy,
            page_index: 1,
            seen: HashSet::new(),
            accepted: Vec::new(),
            empty_streak: 0,
            pages_visited: 0,
            items_seen: 0,
            duplicates: 0,
            extraction_failures: 0,
        }
    }

    /// The page currently being processed
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Consecutive pages that produced no new identity
    pub fn empty_streak(&self) -> u32 {
        self.empty_streak
    }

    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }

    pub fn items_seen(&self) -> usize {
        self.items_seen
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn extraction_failures(&self) -> usize {
        self.extraction_failures
    }

    /// Number of distinct identities seen so far
    pub fn identity_count(&self) -> usize {
        self.seen.len()
    }

    /// Records accepted so far, in discovery order
    pub fn accepted(&self) -> &[RawItemRecord] {
        &self.accepted
    }

    /// Offers a record for acceptance
    ///
    /// Returns true if the record carried a new identity and was appended.
    pub fn admit(&mut self, record: RawItemRecord, tally: &mut PageTally) -> bool {
        tally.items += 1;
        self.items_seen += 1;

        let identity = ItemIdentity::of(&record, self.policy);
        if self.seen.insert(identity) {
            self.accepted.push(record);
            tally.new_identities += 1;
            true
        } else {
            tally.duplicates += 1;
            self.duplicates += 1;
            false
        }
    }

    /// Counts an item the extractor could not turn into a record
    pub fn reject(&mut self, tally: &mut PageTally) {
        tally.extraction_failures += 1;
        self.extraction_failures += 1;
    }

    /// Counts a page that was requested from the fetcher
    pub fn record_visit(&mut self) {
        self.pages_visited += 1;
    }

    /// Updates the empty-page streak from a finished page
    ///
    /// Returns the streak after the update.
    pub fn close_page(&mut self, tally: &PageTally) -> u32 {
        if tally.new_identities == 0 {
            self.empty_streak += 1;
        } else {
            self.empty_streak = 0;
        }
        self.empty_streak
    }

    /// Moves on to the next page and returns its index
    pub fn advance(&mut self) -> u32 {
        self.page_index += 1;
        self.page_index
    }

    /// Consumes the state, returning the accepted records
    pub fn into_records(self) -> Vec<RawItemRecord> {
        self.accepted
    }
}
