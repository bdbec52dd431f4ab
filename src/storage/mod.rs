//! Storage module for persisting sweep results
//!
//! This module handles all database operations for a sweep, including:
//! - SQLite database initialization and schema management
//! - Run and per-retailer status tracking
//! - Per-category crawl outcomes
//! - Merged product listings

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::TerminalCause;
use crate::SweepError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SweepError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SweepError> {
    SqliteStorage::new(path)
}

/// Represents a sweep run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a sweep run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// How one retailer's part of a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetailerStatus {
    Running,
    Completed,
    /// The retailer timeout fired; finished categories were kept
    TimedOut,
    /// No client profile could open a session
    NoSession,
    Failed,
}

impl RetailerStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::NoSession => "no_session",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "timed_out" => Some(Self::TimedOut),
            "no_session" => Some(Self::NoSession),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One retailer within a run
#[derive(Debug, Clone)]
pub struct RetailerRunRecord {
    pub id: i64,
    pub run_id: i64,
    pub retailer: String,
    pub status: RetailerStatus,
    pub profile: Option<String>,
    pub categories: u32,
    pub products: u64,
    pub error_message: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// Outcome of one category crawl
///
/// `cause` is `None` when the crawl never finished (aborted by the retailer
/// timeout or a task failure); `error_message` then says why.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCrawlRecord {
    pub id: i64,
    pub run_id: i64,
    pub retailer: String,
    pub category: String,
    pub url: String,
    pub cause: Option<TerminalCause>,
    pub pages_visited: u32,
    pub items_seen: u64,
    pub items_accepted: u64,
    pub duplicates: u64,
    pub extraction_failures: u64,
    pub error_message: Option<String>,
    pub started_at: String,
    pub finished_at: String,
}

/// A merged product row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub run_id: i64,
    pub retailer: String,
    pub category: String,
    pub name: String,
    pub price: String,
    pub secondary_price: Option<String>,
    pub position: u64,
}
