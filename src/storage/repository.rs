//! Repository Pattern for Country Storage
//!
//! The [`CountryRepository`] trait decouples the refresh orchestrator and the
//! API surface from the storage engine. [`SqliteCountryRepository`] is the
//! production implementation.
//!
//! # Identity
//!
//! Each row carries a `name_key` column holding the Unicode-lowercased name
//! under a UNIQUE constraint. Upserts use
//! `INSERT .. ON CONFLICT(name_key) DO UPDATE`, which keeps the row (and its
//! `id`) in place and leaves no window for a duplicate-name race.
//!
//! # Transactions
//!
//! A refresh batch is written inside one `BEGIN IMMEDIATE` transaction. Any
//! failing statement drops the transaction, which rolls the whole batch back.
//! The connection sits behind a mutex, so readers in this process never see
//! a half-written batch; the immediate write lock serializes writers from
//! other processes.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::models::{
    CountryFilter, CountryRecord, GdpRanking, NewCountry, SortOrder, StatusSnapshot,
};
use crate::utils::error::StoreError;
use crate::utils::fold_name;

const RECORD_COLUMNS: &str = "id, name, capital, region, population, currency_code, \
     exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

// ============================================================================
// Repository Trait
// ============================================================================

/// Persistent mapping from case-insensitive country name to record
pub trait CountryRepository: Send + Sync {
    /// Insert or overwrite every record, atomically
    ///
    /// Returns the number of rows written. On error nothing is written.
    fn upsert_batch(&self, records: &[NewCountry]) -> Result<usize, StoreError>;

    /// Look up one record by case-insensitive name
    fn get_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError>;

    /// Delete one record by case-insensitive name; `false` when absent
    fn delete_by_name(&self, name: &str) -> Result<bool, StoreError>;

    /// Total stored records
    fn count(&self) -> Result<u64, StoreError>;

    /// Filtered and optionally sorted listing
    fn list(&self, filter: &CountryFilter) -> Result<Vec<CountryRecord>, StoreError>;

    /// Highest estimated GDP first, null GDP excluded
    fn top_by_gdp(&self, limit: usize) -> Result<Vec<GdpRanking>, StoreError>;

    /// Latest refresh timestamp across all records
    fn last_refreshed_at(&self) -> Result<Option<String>, StoreError>;

    /// Count plus latest refresh timestamp
    fn status(&self) -> Result<StatusSnapshot, StoreError> {
        Ok(StatusSnapshot {
            total_countries: self.count()?,
            last_refreshed_at: self.last_refreshed_at()?,
        })
    }
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of [`CountryRepository`]
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteCountryRepository {
    conn: Mutex<Connection>,
}

impl SqliteCountryRepository {
    /// Open (or create) a database file
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite repository initialized");
        Ok(repo)
    }

    /// Create in-memory repository
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Create database schema
    fn create_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS countries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    name_key TEXT NOT NULL UNIQUE,
                    capital TEXT,
                    region TEXT,
                    population INTEGER NOT NULL DEFAULT 0,
                    currency_code TEXT,
                    exchange_rate REAL,
                    estimated_gdp REAL,
                    flag_url TEXT,
                    last_refreshed_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_countries_region
                    ON countries(region);

                CREATE INDEX IF NOT EXISTS idx_countries_currency
                    ON countries(currency_code);

                CREATE INDEX IF NOT EXISTS idx_countries_gdp
                    ON countries(estimated_gdp);

                CREATE INDEX IF NOT EXISTS idx_countries_refreshed
                    ON countries(last_refreshed_at);
                "#,
        )?;

        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CountryRecord> {
    Ok(CountryRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        capital: row.get(2)?,
        region: row.get(3)?,
        population: row.get(4)?,
        currency_code: row.get(5)?,
        exchange_rate: row.get(6)?,
        estimated_gdp: row.get(7)?,
        flag_url: row.get(8)?,
        last_refreshed_at: row.get(9)?,
    })
}

impl CountryRepository for SqliteCountryRepository {
    fn upsert_batch(&self, records: &[NewCountry]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        {
            let mut stmt = tx.prepare_cached(
                r#"
                    INSERT INTO countries (
                        name, name_key, capital, region, population, currency_code,
                        exchange_rate, estimated_gdp, flag_url, last_refreshed_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(name_key) DO UPDATE SET
                        name = excluded.name,
                        capital = excluded.capital,
                        region = excluded.region,
                        population = excluded.population,
                        currency_code = excluded.currency_code,
                        exchange_rate = excluded.exchange_rate,
                        estimated_gdp = excluded.estimated_gdp,
                        flag_url = excluded.flag_url,
                        last_refreshed_at = excluded.last_refreshed_at
                    "#,
            )?;

            for record in records {
                stmt.execute(params![
                    record.name,
                    fold_name(&record.name),
                    record.capital,
                    record.region,
                    record.population,
                    record.currency_code,
                    record.exchange_rate,
                    record.estimated_gdp,
                    record.flag_url,
                    record.last_refreshed_at,
                ])?;
            }
        }

        tx.commit()?;
        tracing::info!(count = records.len(), "Committed country batch");
        Ok(records.len())
    }

    fn get_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM countries WHERE name_key = ?1"),
                params![fold_name(name)],
                row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    fn delete_by_name(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM countries WHERE name_key = ?1",
            params![fold_name(name)],
        )?;

        if deleted > 0 {
            tracing::info!(name = %name, "Deleted country");
        }
        Ok(deleted > 0)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn list(&self, filter: &CountryFilter) -> Result<Vec<CountryRecord>, StoreError> {
        let mut clauses = Vec::new();
        let mut args: Vec<&str> = Vec::new();

        if let Some(region) = filter.region.as_deref() {
            args.push(region);
            clauses.push(format!("region = ?{}", args.len()));
        }
        if let Some(currency) = filter.currency.as_deref() {
            args.push(currency);
            clauses.push(format!("currency_code = ?{}", args.len()));
        }

        let mut query = format!("SELECT {RECORD_COLUMNS} FROM countries");
        if !clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
        }

        // Null GDP always trails, whichever direction.
        query.push_str(match filter.sort {
            Some(SortOrder::GdpDesc) => " ORDER BY estimated_gdp IS NULL, estimated_gdp DESC, id",
            Some(SortOrder::GdpAsc) => " ORDER BY estimated_gdp IS NULL, estimated_gdp ASC, id",
            None => " ORDER BY id",
        });

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query)?;
        let records = stmt
            .query_map(params_from_iter(args.iter()), row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn top_by_gdp(&self, limit: usize) -> Result<Vec<GdpRanking>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT name, estimated_gdp FROM countries
             WHERE estimated_gdp IS NOT NULL
             ORDER BY estimated_gdp DESC, id
             LIMIT ?1",
        )?;

        let ranking = stmt
            .query_map(params![limit as i64], |row| {
                Ok(GdpRanking {
                    name: row.get(0)?,
                    estimated_gdp: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ranking)
    }

    fn last_refreshed_at(&self) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let latest: Option<String> =
            conn.query_row("SELECT MAX(last_refreshed_at) FROM countries", [], |row| {
                row.get(0)
            })?;
        Ok(latest)
    }
}

// ============================================================================
// Tests
// ============================================================================
