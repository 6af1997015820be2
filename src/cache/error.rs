use thiserror::Error;

use crate::source::SourceError;

/// Errors surfaced by the cache layer.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("storage error: {0}")]
  Storage(#[from] rusqlite::Error),

  #[error("storage lock poisoned")]
  Poisoned,

  #[error("unreadable cell {value:?} in table {table}")]
  CorruptRow { table: String, value: String },

  #[error("remote source unavailable: {0}")]
  SourceUnavailable(#[source] SourceError),

  #[error("refresh task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl CacheError {
  /// True for local faults, which are fatal for the call.
  pub fn is_storage(&self) -> bool {
    !matches!(self, CacheError::SourceUnavailable(_))
  }
}

pub type Result<T> = std::result::Result<T, CacheError>;
