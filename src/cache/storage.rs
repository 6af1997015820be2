//! Per-entity series storage and its SQLite implementation.
//!
//! Every (country, metric) pair gets its own table with a `Date` primary key
//! and one integer column named after the metric. Rows are append-only:
//! writes use `INSERT OR IGNORE`, so an existing date is never overwritten.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Mutex, MutexGuard};

use super::error::{CacheError, Result};
use super::key::EntityKey;
use super::traits::SeriesEntry;
use crate::db::Database;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Trait for series storage backends.
pub trait SeriesStorage: Send + Sync {
  /// Whether the backing table for `key` exists.
  fn table_exists(&self, key: &EntityKey) -> Result<bool>;

  /// Create the backing table if absent. Safe to call repeatedly.
  fn ensure_schema(&self, key: &EntityKey) -> Result<()>;

  /// Insert one entry unless its date is already stored.
  /// Returns whether a row was inserted.
  fn upsert(&self, key: &EntityKey, entry: SeriesEntry) -> Result<bool>;

  /// Append-if-absent for a whole series in one transaction.
  /// Returns the number of rows inserted.
  fn upsert_series(&self, key: &EntityKey, entries: &[SeriesEntry]) -> Result<usize>;

  /// Newest stored date, or `None` when the table has no rows.
  fn latest_date(&self, key: &EntityKey) -> Result<Option<NaiveDate>>;

  /// All stored entries, ascending by date.
  fn read_all(&self, key: &EntityKey) -> Result<Vec<SeriesEntry>>;

  /// Names of all entity tables, sorted.
  fn list_tables(&self) -> Result<Vec<String>>;
}

/// SQLite-based series storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  pub fn new(db: Database) -> Self {
    Self {
      conn: Mutex::new(db.into_connection()),
    }
  }

  #[cfg(test)]
  pub fn in_memory() -> Self {
    Self::new(Database::open_in_memory().unwrap())
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|_| CacheError::Poisoned)
  }
}

/// Quoted table and column identifiers for `key`.
///
/// `table_name` only yields `[A-Za-z0-9_]`, so quoting cannot be escaped.
fn identifiers(key: &EntityKey) -> (String, String) {
  (
    format!("\"{}\"", key.table_name()),
    format!("\"{}\"", key.metric().column()),
  )
}

fn parse_date(table: &str, value: String) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| CacheError::CorruptRow {
    table: table.to_string(),
    value,
  })
}

fn insert_sql(table: &str, column: &str) -> String {
  format!("INSERT OR IGNORE INTO {} (Date, {}) VALUES (?1, ?2)", table, column)
}

fn to_sql_count(value: u64) -> i64 {
  i64::try_from(value).unwrap_or(i64::MAX)
}

impl SeriesStorage for SqliteStorage {
  fn table_exists(&self, key: &EntityKey) -> Result<bool> {
    let conn = self.conn()?;
    let count: i64 = conn.query_row(
      "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
      params![key.table_name()],
      |row| row.get(0),
    )?;
    Ok(count > 0)
  }

  fn ensure_schema(&self, key: &EntityKey) -> Result<()> {
    let conn = self.conn()?;
    let (table, column) = identifiers(key);
    conn.execute_batch(&format!(
      "CREATE TABLE IF NOT EXISTS {} (Date TEXT PRIMARY KEY, {} INTEGER NOT NULL);",
      table, column
    ))?;
    Ok(())
  }

  fn upsert(&self, key: &EntityKey, entry: SeriesEntry) -> Result<bool> {
    let conn = self.conn()?;
    let (table, column) = identifiers(key);
    let inserted = conn.execute(
      &insert_sql(&table, &column),
      params![
        entry.date.format(DATE_FORMAT).to_string(),
        to_sql_count(entry.value)
      ],
    )?;
    Ok(inserted > 0)
  }

  fn upsert_series(&self, key: &EntityKey, entries: &[SeriesEntry]) -> Result<usize> {
    let mut conn = self.conn()?;
    let (table, column) = identifiers(key);

    let mut ordered = entries.to_vec();
    ordered.sort_by_key(|e| e.date);

    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
      let mut stmt = tx.prepare_cached(&insert_sql(&table, &column))?;
      for entry in &ordered {
        inserted += stmt.execute(params![
          entry.date.format(DATE_FORMAT).to_string(),
          to_sql_count(entry.value)
        ])?;
      }
    }
    tx.commit()?;

    Ok(inserted)
  }

  fn latest_date(&self, key: &EntityKey) -> Result<Option<NaiveDate>> {
    let conn = self.conn()?;
    let (table, _) = identifiers(key);

    // Compare parsed dates rather than relying on text ordering.
    let mut stmt = conn.prepare(&format!("SELECT Date FROM {}", table))?;
    let mut latest = None;
    for raw in stmt.query_map([], |row| row.get::<_, String>(0))? {
      let date = parse_date(&table, raw?)?;
      if latest.map_or(true, |l| date > l) {
        latest = Some(date);
      }
    }

    Ok(latest)
  }

  fn read_all(&self, key: &EntityKey) -> Result<Vec<SeriesEntry>> {
    let conn = self.conn()?;
    let (table, column) = identifiers(key);

    let mut stmt = conn.prepare(&format!("SELECT Date, {} FROM {}", column, table))?;
    let rows = stmt.query_map([], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut entries = Vec::new();
    for row in rows {
      let (raw_date, value) = row?;
      let date = parse_date(&table, raw_date)?;
      let value = u64::try_from(value).map_err(|_| CacheError::CorruptRow {
        table: table.clone(),
        value: format!("{} on {}", value, date),
      })?;
      entries.push(SeriesEntry::new(date, value));
    }
    entries.sort_by_key(|e| e.date);

    Ok(entries)
  }

  fn list_tables(&self) -> Result<Vec<String>> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare(
      "SELECT name FROM sqlite_master
       WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
       ORDER BY name",
    )?;
    let names = stmt
      .query_map([], |row| row.get::<_, String>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
  }
}
