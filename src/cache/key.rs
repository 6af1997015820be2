//! Entity keys and the table identifiers derived from them.

use serde::Deserialize;
use std::fmt;

/// Which statistic a series counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
  #[default]
  Deaths,
  Recovered,
}

impl Metric {
  /// Value of the `status` query parameter on the remote API.
  pub fn status(self) -> &'static str {
    match self {
      Metric::Deaths => "deaths",
      Metric::Recovered => "recovered",
    }
  }

  /// Name of the value column, also used as the table suffix.
  pub fn column(self) -> &'static str {
    match self {
      Metric::Deaths => "Deaths",
      Metric::Recovered => "Recovered",
    }
  }

  pub fn toggle(self) -> Self {
    match self {
      Metric::Deaths => Metric::Recovered,
      Metric::Recovered => Metric::Deaths,
    }
  }
}

impl fmt::Display for Metric {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.column())
  }
}

/// A (country, metric) pair identifying one cached series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
  country: String,
  metric: Metric,
}

impl EntityKey {
  /// Build a key, collapsing runs of whitespace in the country name.
  ///
  /// Returns `None` for a blank country name.
  pub fn new(country: &str, metric: Metric) -> Option<Self> {
    let country = country.split_whitespace().collect::<Vec<_>>().join(" ");
    if country.is_empty() {
      return None;
    }
    Some(Self { country, metric })
  }

  pub fn country(&self) -> &str {
    &self.country
  }

  pub fn metric(&self) -> Metric {
    self.metric
  }

  /// SQL identifier of the backing table, e.g. `South_Africa_Deaths`.
  ///
  /// The result only ever contains `[A-Za-z0-9_]`. Spaces become underscores;
  /// any other character is written as `_x<hex>_` so distinct names stay
  /// distinct.
  pub fn table_name(&self) -> String {
    let mut name = String::with_capacity(self.country.len() + 12);
    for c in self.country.chars() {
      match c {
        'A'..='Z' | 'a'..='z' | '0'..='9' | '_' => name.push(c),
        ' ' => name.push('_'),
        other => name.push_str(&format!("_x{:x}_", other as u32)),
      }
    }
    name.push('_');
    name.push_str(self.metric.column());
    name
  }
}

impl EntityKey {
  /// Identity of the backing store.
  ///
  /// SQLite compares table names case-insensitively, and spaces and
  /// underscores map to the same table name, so "Italy", "italy" and
  /// "ITALY" all share one store.
  pub fn store_id(&self) -> String {
    self.table_name().to_ascii_lowercase()
  }
}

impl fmt::Display for EntityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.country, self.metric.status())
  }
}
