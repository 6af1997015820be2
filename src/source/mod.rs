//! Remote source of per-country time series.

mod api_types;
mod client;

pub use client::HistoryClient;

use std::collections::BTreeMap;
use std::future::Future;

use chrono::NaiveDate;
use thiserror::Error;

use crate::cache::Metric;

/// What the remote source knows about a (country, metric) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// Complete series, keyed by date
  Found(BTreeMap<NaiveDate, u64>),
  /// No data for this country, or a response without the expected fields
  Unavailable,
}

/// Transport-level failures talking to the remote source.
#[derive(Debug, Error)]
pub enum SourceError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("server returned status {0}")]
  Status(u16),
}

/// A remote time-series provider.
pub trait SeriesSource: Send + Sync {
  /// Fetch the full series for `country`. Never returns a delta.
  fn fetch(
    &self,
    country: &str,
    metric: Metric,
  ) -> impl Future<Output = Result<FetchOutcome, SourceError>> + Send;
}
