//! Cache-backed access to per-country time series.
//!
//! This module keeps one SQLite table per (country, metric) and:
//! - Reuses a table whose newest date is yesterday (the source lags one day)
//! - Otherwise fetches the full series and appends dates not yet stored
//! - Serializes check-refresh-read per entity key across concurrent callers
//! - Serves the last known rows when the remote source is unreachable

mod error;
mod freshness;
mod guard;
mod key;
mod layer;
mod storage;
mod traits;

pub use error::CacheError;
pub use key::Metric;
pub use layer::{CacheLayer, RefreshPolicy};
pub use storage::SqliteStorage;
pub use traits::{CacheResult, CacheSource, SeriesEntry};
