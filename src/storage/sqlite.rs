//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::catalog::RawItemRecord;
use crate::state::TerminalCause;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    CategoryCrawlRecord, ProductRecord, RetailerRunRecord, RetailerStatus, RunRecord, RunStatus,
};
use crate::SweepError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SweepError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

fn retailer_run_from_row(row: &Row) -> rusqlite::Result<RetailerRunRecord> {
    Ok(RetailerRunRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        retailer: row.get(2)?,
        status: RetailerStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(RetailerStatus::Failed),
        profile: row.get(4)?,
        categories: row.get(5)?,
        products: row.get::<_, i64>(6)? as u64,
        error_message: row.get(7)?,
        started_at: row.get(8)?,
        finished_at: row.get(9)?,
    })
}

const CATEGORY_COLUMNS: &str = "id, run_id, retailer, category, url, cause, pages_visited,
     items_seen, items_accepted, duplicates, extraction_failures, error_message,
     started_at, finished_at";

fn category_from_row(row: &Row) -> rusqlite::Result<CategoryCrawlRecord> {
    Ok(CategoryCrawlRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        retailer: row.get(2)?,
        category: row.get(3)?,
        url: row.get(4)?,
        cause: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| TerminalCause::from_db_string(&s)),
        pages_visited: row.get(6)?,
        items_seen: row.get::<_, i64>(7)? as u64,
        items_accepted: row.get::<_, i64>(8)? as u64,
        duplicates: row.get::<_, i64>(9)? as u64,
        extraction_failures: row.get::<_, i64>(10)? as u64,
        error_message: row.get(11)?,
        started_at: row.get(12)?,
        finished_at: row.get(13)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .map_err(|_| StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Retailer Runs =====

    fn start_retailer(&mut self, run_id: i64, retailer: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO retailer_runs (run_id, retailer, status, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, retailer, RetailerStatus::Running.to_db_string(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_retailer(
        &mut self,
        id: i64,
        status: RetailerStatus,
        profile: Option<&str>,
        categories: u32,
        products: u64,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE retailer_runs
             SET status = ?1, profile = ?2, categories = ?3, products = ?4,
                 error_message = ?5, finished_at = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                profile,
                categories,
                products as i64,
                error_message,
                now,
                id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RetailerRunNotFound(id));
        }
        Ok(())
    }

    fn get_retailer_runs(&self, run_id: i64) -> StorageResult<Vec<RetailerRunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, retailer, status, profile, categories, products,
             error_message, started_at, finished_at
             FROM retailer_runs WHERE run_id = ?1 ORDER BY id",
        )?;

        let runs = stmt
            .query_map(params![run_id], retailer_run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Category Crawls =====

    fn insert_category_crawl(&mut self, record: &CategoryCrawlRecord) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO category_crawls (run_id, retailer, category, url, cause, pages_visited,
             items_seen, items_accepted, duplicates, extraction_failures, error_message,
             started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.run_id,
                record.retailer,
                record.category,
                record.url,
                record.cause.map(|c| c.to_db_string()),
                record.pages_visited,
                record.items_seen as i64,
                record.items_accepted as i64,
                record.duplicates as i64,
                record.extraction_failures as i64,
                record.error_message,
                record.started_at,
                record.finished_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_category_crawls(&self, run_id: i64) -> StorageResult<Vec<CategoryCrawlRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM category_crawls WHERE run_id = ?1 ORDER BY retailer, category, id",
            CATEGORY_COLUMNS
        ))?;

        let crawls = stmt
            .query_map(params![run_id], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(crawls)
    }

    fn get_cause_breakdown(&self, run_id: i64) -> StorageResult<HashMap<TerminalCause, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT cause, COUNT(*) FROM category_crawls
             WHERE run_id = ?1 AND cause IS NOT NULL GROUP BY cause",
        )?;

        let mut breakdown = HashMap::new();
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (cause, count) = row?;
            if let Some(cause) = TerminalCause::from_db_string(&cause) {
                breakdown.insert(cause, count as u64);
            }
        }

        Ok(breakdown)
    }

    fn get_low_yield_categories(
        &self,
        run_id: i64,
        threshold: u64,
    ) -> StorageResult<Vec<CategoryCrawlRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM category_crawls
             WHERE run_id = ?1 AND items_accepted < ?2
             ORDER BY retailer, category, id",
            CATEGORY_COLUMNS
        ))?;

        let crawls = stmt
            .query_map(params![run_id, threshold as i64], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(crawls)
    }

    // ===== Products =====

    fn insert_products(
        &mut self,
        run_id: i64,
        retailer: &str,
        products: &[RawItemRecord],
    ) -> StorageResult<u64> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO products (run_id, retailer, category, name, price, secondary_price, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for (position, product) in products.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    retailer,
                    product.category,
                    product.name,
                    product.price,
                    product.secondary_price,
                    position as i64,
                ])?;
            }
        }
        tx.commit()?;

        Ok(products.len() as u64)
    }

    fn get_products(&self, run_id: i64, retailer: &str) -> StorageResult<Vec<ProductRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, retailer, category, name, price, secondary_price, position
             FROM products WHERE run_id = ?1 AND retailer = ?2 ORDER BY position",
        )?;

        let products = stmt
            .query_map(params![run_id, retailer], |row| {
                Ok(ProductRecord {
                    run_id: row.get(0)?,
                    retailer: row.get(1)?,
                    category: row.get(2)?,
                    name: row.get(3)?,
                    price: row.get(4)?,
                    secondary_price: row.get(5)?,
                    position: row.get::<_, i64>(6)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    fn count_products(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawl_record(
        run_id: i64,
        category: &str,
        accepted: u64,
        cause: Option<TerminalCause>,
    ) -> CategoryCrawlRecord {
        let now = Utc::now().to_rfc3339();
        CategoryCrawlRecord {
            id: 0,
            run_id,
            retailer: "aldi".to_string(),
            category: category.to_string(),
            url: format!("https://www.aldi.co.uk/products/{}", category.to_lowercase()),
            cause,
            pages_visited: 3,
            items_seen: accepted + 2,
            items_accepted: accepted,
            duplicates: 2,
            extraction_failures: 0,
            error_message: None,
            started_at: now.clone(),
            finished_at: now,
        }
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "test_hash");
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_complete_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        storage.complete_run(run_id).unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Completed);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());
        assert!(matches!(
            storage.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
        assert!(storage.complete_run(42).is_err());
    }

    #[test]
    fn test_retailer_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();

        let aldi = storage.start_retailer(run_id, "aldi").unwrap();
        let tesco = storage.start_retailer(run_id, "tesco").unwrap();
        storage
            .finish_retailer(aldi, RetailerStatus::Completed, Some("desktop"), 4, 120, None)
            .unwrap();
        storage
            .finish_retailer(
                tesco,
                RetailerStatus::NoSession,
                None,
                0,
                0,
                Some("No working client profile"),
            )
            .unwrap();

        let runs = storage.get_retailer_runs(run_id).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].retailer, "aldi");
        assert_eq!(runs[0].status, RetailerStatus::Completed);
        assert_eq!(runs[0].profile.as_deref(), Some("desktop"));
        assert_eq!(runs[0].products, 120);
        assert_eq!(runs[1].status, RetailerStatus::NoSession);
        assert!(runs[1].finished_at.is_some());
    }

    #[test]
    fn test_category_crawls_and_breakdown() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();

        let record = crawl_record(run_id, "Bakery", 40, Some(TerminalCause::EndMarker));
        storage.insert_category_crawl(&record).unwrap();
        let record = crawl_record(run_id, "Frozen", 2, Some(TerminalCause::EmptyStreak));
        storage.insert_category_crawl(&record).unwrap();
        let record = crawl_record(run_id, "Dairy", 30, Some(TerminalCause::EndMarker));
        storage.insert_category_crawl(&record).unwrap();
        let mut aborted = crawl_record(run_id, "Drinks", 0, None);
        aborted.error_message = Some("aborted: retailer timeout".to_string());
        storage.insert_category_crawl(&aborted).unwrap();

        let crawls = storage.get_category_crawls(run_id).unwrap();
        let names: Vec<&str> = crawls.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Bakery", "Dairy", "Drinks", "Frozen"]);
        assert_eq!(crawls[0].cause, Some(TerminalCause::EndMarker));
        assert_eq!(crawls[2].cause, None);

        let breakdown = storage.get_cause_breakdown(run_id).unwrap();
        assert_eq!(breakdown.get(&TerminalCause::EndMarker), Some(&2));
        assert_eq!(breakdown.get(&TerminalCause::EmptyStreak), Some(&1));
        assert_eq!(breakdown.values().sum::<u64>(), 3);

        let low = storage.get_low_yield_categories(run_id, 5).unwrap();
        let names: Vec<&str> = low.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Drinks", "Frozen"]);
    }

    #[test]
    fn test_products_keep_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();

        let products = vec![
            RawItemRecord::new("aldi", "Bakery", "Bagels", "£1.00"),
            RawItemRecord::new("aldi", "Bakery", "Rye", "£2.00").with_secondary_price("£1.50"),
            RawItemRecord::new("aldi", "Dairy", "Butter", "£1.99"),
        ];

        assert_eq!(storage.insert_products(run_id, "aldi", &products).unwrap(), 3);
        assert_eq!(storage.count_products(run_id).unwrap(), 3);

        let stored = storage.get_products(run_id, "aldi").unwrap();
        let names: Vec<&str> = stored.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bagels", "Rye", "Butter"]);
        assert_eq!(stored[1].secondary_price.as_deref(), Some("£1.50"));
        assert_eq!(stored[2].position, 2);

        assert!(storage.get_products(run_id, "tesco").unwrap().is_empty());
    }
}
