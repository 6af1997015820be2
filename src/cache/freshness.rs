//! Freshness rule for cached series.
//!
//! The remote source publishes with a one-day lag, so a series is current when
//! its newest entry is dated yesterday. Today is never expected to be present.

use chrono::{Days, NaiveDate, Utc};

/// Returns true iff `latest` is exactly one day before `today`.
///
/// An empty store (`None`), an older date, today itself, or a future date are
/// all stale.
pub fn is_fresh(latest: Option<NaiveDate>, today: NaiveDate) -> bool {
  match (latest, today.checked_sub_days(Days::new(1))) {
    (Some(latest), Some(yesterday)) => latest == yesterday,
    _ => false,
  }
}

/// Source of the caller's current date.
pub trait Clock: Send + Sync {
  fn today(&self) -> NaiveDate;
}

/// Wall clock, in UTC to match the remote source's reporting days.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate {
    Utc::now().date_naive()
  }
}

/// A clock pinned to one date.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl Clock for FixedClock {
  fn today(&self) -> NaiveDate {
    self.0
  }
}
