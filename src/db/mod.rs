use color_eyre::{eyre::eyre, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Owned SQLite connection backing the series cache.
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create the database at `path`, or at the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)
          .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
      }
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    let db = Self { conn };
    db.configure()?;

    Ok(db)
  }

  /// Open a private in-memory database.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Ok(Self { conn })
  }

  /// Get the default database path
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("covid-dash").join("covid_data.db"))
  }

  fn configure(&self) -> Result<()> {
    self
      .conn
      .busy_timeout(Duration::from_secs(5))
      .map_err(|e| eyre!("Failed to set busy timeout: {}", e))?;
    self
      .conn
      .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
      .map_err(|e| eyre!("Failed to enable WAL: {}", e))?;
    Ok(())
  }

  /// Hand the connection over to its owner.
  pub fn into_connection(self) -> Connection {
    self.conn
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_open_creates_parent_directories() {
    let dir = std::env::temp_dir().join(format!("covid-dash-db-{}", std::process::id()));
    let path = dir.join("nested").join("covid_data.db");
    let _ = std::fs::remove_dir_all(&dir);

    let db = Database::open(Some(&path)).unwrap();
    drop(db.into_connection());
    assert!(path.exists());

    let _ = std::fs::remove_dir_all(&dir);
  }

  #[test]
  fn test_default_path_file_name() {
    let path = Database::default_path().unwrap();
    assert!(path.ends_with("covid-dash/covid_data.db"));
  }
}
