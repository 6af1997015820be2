//! Cache layer that orchestrates freshness checks with remote refreshes.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::{CacheError, Result};
use super::freshness::{is_fresh, Clock, SystemClock};
use super::guard::KeyedLocks;
use super::key::{EntityKey, Metric};
use super::storage::SeriesStorage;
use super::traits::{CacheResult, CacheSource, SeriesEntry};
use crate::source::{FetchOutcome, SeriesSource, SourceError};

/// How often to retry a transport failure before giving up on a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
  /// Total fetch attempts per refresh, at least one
  pub attempts: u32,
  /// Delay before the second attempt, growing linearly after that
  pub backoff: Duration,
}

impl Default for RefreshPolicy {
  fn default() -> Self {
    Self {
      attempts: 3,
      backoff: Duration::from_millis(500),
    }
  }
}

/// Cache layer that manages freshness and remote refreshes.
///
/// This layer sits between the presentation layer and the remote source.
/// For every (country, metric) it keeps one store that is refreshed when its
/// newest date isn't yesterday, and falls back to the stored rows when the
/// source can't be reached.
pub struct CacheLayer<S: SeriesStorage, R: SeriesSource> {
  storage: Arc<S>,
  source: Arc<R>,
  clock: Arc<dyn Clock>,
  locks: Arc<KeyedLocks>,
  policy: RefreshPolicy,
}

impl<S: SeriesStorage + 'static, R: SeriesSource + 'static> CacheLayer<S, R> {
  /// Create a new cache layer with the given storage backend and source.
  pub fn new(storage: S, source: R) -> Self {
    Self {
      storage: Arc::new(storage),
      source: Arc::new(source),
      clock: Arc::new(SystemClock),
      locks: Arc::new(KeyedLocks::new()),
      policy: RefreshPolicy::default(),
    }
  }

  /// Use a different notion of "today".
  #[cfg(test)]
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Current series for `country`, ascending by date.
  ///
  /// An empty series means the source has no data for this country.
  pub async fn get_series(&self, country: &str, metric: Metric) -> Result<Vec<SeriesEntry>> {
    self
      .fetch_series(country, metric)
      .await
      .map(|result| result.data)
  }

  /// Like [`get_series`](Self::get_series), with where the rows came from.
  ///
  /// 1. Lock the entity key and create its table if missing
  /// 2. If the newest stored date is yesterday, return the stored rows
  /// 3. Otherwise fetch the full series and append the dates not yet stored
  /// 4. On a transport failure, return the stored rows if there are any
  /// 5. Read back the full store
  ///
  /// The lock is held from step 1 to step 5, so no caller sees a store that
  /// is only partly refreshed. The sequence runs on its own task: dropping the
  /// returned future stops the wait, not the refresh.
  pub async fn fetch_series(
    &self,
    country: &str,
    metric: Metric,
  ) -> Result<CacheResult<Vec<SeriesEntry>>> {
    let Some(key) = EntityKey::new(country, metric) else {
      debug!("blank country, nothing to fetch");
      return Ok(CacheResult::new(Vec::new(), CacheSource::CacheFresh, None));
    };

    let this = self.clone();
    tokio::spawn(async move { this.fetch_locked(&key).await }).await?
  }

  async fn fetch_locked(&self, key: &EntityKey) -> Result<CacheResult<Vec<SeriesEntry>>> {
    let _guard = self.locks.lock(key).await;

    self.storage.ensure_schema(key)?;
    let latest = self.storage.latest_date(key)?;
    let today = self.clock.today();

    if is_fresh(latest, today) {
      debug!(%key, ?latest, "cache hit");
      let rows = self.storage.read_all(key)?;
      return Ok(CacheResult::new(rows, CacheSource::CacheFresh, latest));
    }

    info!(%key, ?latest, %today, "store stale, refreshing");

    let source = match self.fetch_with_retry(key).await {
      Ok(FetchOutcome::Found(series)) => {
        let entries: Vec<SeriesEntry> = series
          .into_iter()
          .map(|(date, value)| SeriesEntry::new(date, value))
          .collect();
        let inserted = self.storage.upsert_series(key, &entries)?;
        info!(%key, fetched = entries.len(), inserted, "store refreshed");
        CacheSource::Network
      }
      Ok(FetchOutcome::Unavailable) => {
        info!(%key, "no data from remote source");
        CacheSource::Network
      }
      Err(e) if latest.is_some() => {
        warn!(%key, error = %e, "refresh failed, serving cached rows");
        CacheSource::Offline
      }
      Err(e) => {
        warn!(%key, error = %e, "refresh failed with nothing cached");
        return Err(CacheError::SourceUnavailable(e));
      }
    };

    let rows = self.storage.read_all(key)?;
    let latest = rows.last().map(|entry| entry.date);
    Ok(CacheResult::new(rows, source, latest))
  }

  /// Names of every table in the cache.
  pub fn cached_tables(&self) -> Result<Vec<String>> {
    self.storage.list_tables()
  }

  async fn fetch_with_retry(
    &self,
    key: &EntityKey,
  ) -> std::result::Result<FetchOutcome, SourceError> {
    let attempts = self.policy.attempts.max(1);
    let mut attempt = 1;

    loop {
      match self.source.fetch(key.country(), key.metric()).await {
        Err(e) if attempt < attempts => {
          debug!(%key, attempt, error = %e, "fetch failed, retrying");
          tokio::time::sleep(self.policy.backoff * attempt).await;
          attempt += 1;
        }
        outcome => return outcome,
      }
    }
  }
}

impl<S: SeriesStorage, R: SeriesSource> Clone for CacheLayer<S, R> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      source: Arc::clone(&self.source),
      clock: Arc::clone(&self.clock),
      locks: Arc::clone(&self.locks),
      policy: self.policy,
    }
  }
}
