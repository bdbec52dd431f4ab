/// Phase and terminal cause definitions for a single category crawl
use std::fmt;

/// Where a category crawl currently is
///
/// A crawl starts in `Fetching(1)` and cycles
/// `Fetching(n) -> Extracting(n) -> Evaluating(n)` until evaluation either
/// moves on to `Fetching(n + 1)` or ends in `Terminated`. A hard fetch
/// failure goes straight from `Fetching(n)` to `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Waiting on the fetcher for the given page
    Fetching(u32),

    /// Pulling records out of the given page
    Extracting(u32),

    /// Applying dedup accounting and the termination checks
    Evaluating(u32),

    /// The crawl has stopped
    Terminated(TerminalCause),
}

impl CrawlPhase {
    /// The phase every crawl starts in
    pub fn initial() -> Self {
        Self::Fetching(1)
    }

    /// Returns true once the crawl has stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    /// Page the phase refers to, if any
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Fetching(page) | Self::Extracting(page) | Self::Evaluating(page) => Some(*page),
            Self::Terminated(_) => None,
        }
    }

    /// Checks whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: &CrawlPhase) -> bool {
        match (self, next) {
            (Self::Fetching(a), Self::Extracting(b)) => a == b,
            (Self::Fetching(_), Self::Terminated(TerminalCause::FetchFailed)) => true,
            (Self::Extracting(a), Self::Evaluating(b)) => a == b,
            (Self::Evaluating(a), Self::Fetching(b)) => *b == a + 1,
            (Self::Evaluating(_), Self::Terminated(cause)) => {
                *cause != TerminalCause::FetchFailed
            }
            _ => false,
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching(page) => write!(f, "fetching page {}", page),
            Self::Extracting(page) => write!(f, "extracting page {}", page),
            Self::Evaluating(page) => write!(f, "evaluating page {}", page),
            Self::Terminated(cause) => write!(f, "terminated ({})", cause),
        }
    }
}

/// Why a category crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalCause {
    /// The page reported that no next page exists
    EndMarker,

    /// Too many consecutive pages produced no new items
    EmptyStreak,

    /// A page was almost entirely items already seen
    DuplicateOverlap,

    /// The page ceiling was reached
    PageCeiling,

    /// The fetcher failed in a way that retrying the next page will not fix
    FetchFailed,
}

impl TerminalCause {
    /// Returns true if the cause indicates the listing was read to its end
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            Self::EndMarker | Self::EmptyStreak | Self::DuplicateOverlap
        )
    }

    /// Converts the cause to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::EndMarker => "end_marker",
            Self::EmptyStreak => "empty_streak",
            Self::DuplicateOverlap => "duplicate_overlap",
            Self::PageCeiling => "page_ceiling",
            Self::FetchFailed => "fetch_failed",
        }
    }

    /// Parses a cause from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "end_marker" => Some(Self::EndMarker),
            "empty_streak" => Some(Self::EmptyStreak),
            "duplicate_overlap" => Some(Self::DuplicateOverlap),
            "page_ceiling" => Some(Self::PageCeiling),
            "fetch_failed" => Some(Self::FetchFailed),
            _ => None,
        }
    }

    /// Returns all terminal causes
    pub fn all() -> [Self; 5] {
        [
            Self::EndMarker,
            Self::EmptyStreak,
            Self::DuplicateOverlap,
            Self::PageCeiling,
            Self::FetchFailed,
        ]
    }
}

impl fmt::Display for TerminalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EndMarker => "end of pagination",
            Self::EmptyStreak => "no new items",
            Self::DuplicateOverlap => "duplicate overlap",
            Self::PageCeiling => "page ceiling",
            Self::FetchFailed => "fetch failed",
        };
        f.write_str(s)
    }
}
