//! Core types shared by the cache layer and its callers.

use chrono::NaiveDate;

/// One day's count in a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeriesEntry {
  pub date: NaiveDate,
  pub value: u64,
}

impl SeriesEntry {
  pub fn new(date: NaiveDate, value: u64) -> Self {
    Self { date, value }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// Newest date present in the store after the operation
  pub latest: Option<NaiveDate>,
}

impl<T> CacheResult<T> {
  pub fn new(data: T, source: CacheSource, latest: Option<NaiveDate>) -> Self {
    Self {
      data,
      source,
      latest,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Store was refreshed from the remote source during this call
  Network,
  /// Store was already fresh, no remote call made
  CacheFresh,
  /// Refresh failed at the transport level, serving the last known rows
  Offline,
}

impl CacheSource {
  pub fn label(self) -> &'static str {
    match self {
      CacheSource::Network => "network",
      CacheSource::CacheFresh => "cache",
      CacheSource::Offline => "offline",
    }
  }
}
