use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::{Metric, RefreshPolicy};
use crate::countries;

const DEFAULT_API_URL: &str = "https://covid-api.mmediagroup.fr/v1/history";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub refresh: RefreshConfig,
  /// SQLite file (defaults to $XDG_DATA_HOME/covid-dash/covid_data.db)
  pub database: Option<PathBuf>,
  pub default_country: String,
  pub default_metric: Metric,
  /// Countries the dashboard accepts as input
  pub countries: Vec<String>,
  /// Tracing filter used when COVID_DASH_LOG is unset
  pub log_level: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      refresh: RefreshConfig::default(),
      database: None,
      default_country: "South Africa".to_string(),
      default_metric: Metric::Deaths,
      countries: countries::DEFAULT_COUNTRIES
        .iter()
        .map(|c| c.to_string())
        .collect(),
      log_level: "info".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub url: String,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_API_URL.to_string(),
      timeout_secs: 30,
    }
  }
}

impl ApiConfig {
  /// Parsed and validated endpoint URL.
  pub fn url(&self) -> Result<Url> {
    let url = Url::parse(&self.url).map_err(|e| eyre!("Invalid API url {}: {}", self.url, e))?;
    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(eyre!("Unsupported API url scheme: {}", other)),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
  /// Fetch attempts per refresh
  pub attempts: u32,
  pub backoff_ms: u64,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    let policy = RefreshPolicy::default();
    Self {
      attempts: policy.attempts,
      backoff_ms: policy.backoff.as_millis() as u64,
    }
  }
}

impl RefreshConfig {
  pub fn policy(&self) -> RefreshPolicy {
    RefreshPolicy {
      attempts: self.attempts.max(1),
      backoff: Duration::from_millis(self.backoff_ms),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./covid-dash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/covid-dash/config.yaml
  ///
  /// Without a file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(url) = std::env::var("COVID_DASH_API_URL") {
      config.api.url = url;
    }
    config.api.url()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("covid-dash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("covid-dash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert_eq!(config.default_country, "South Africa");
    assert_eq!(config.default_metric, Metric::Deaths);
    assert!(config.countries.iter().any(|c| c == "South Africa"));
    assert_eq!(config.refresh.policy(), RefreshPolicy::default());
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let config = Config::parse(
      r#"
default_country: Italy
default_metric: recovered
refresh:
  attempts: 5
"#,
    )
    .unwrap();

    assert_eq!(config.default_country, "Italy");
    assert_eq!(config.default_metric, Metric::Recovered);
    assert_eq!(config.refresh.attempts, 5);
    assert_eq!(config.refresh.backoff_ms, 500);
    assert_eq!(config.api.timeout_secs, 30);
  }

  #[test]
  fn test_country_list_override() {
    let config = Config::parse("countries: [Italy, France]").unwrap();
    assert_eq!(config.countries, vec!["Italy", "France"]);
  }

  #[test]
  fn test_zero_attempts_still_fetches_once() {
    let config = Config::parse("refresh: { attempts: 0, backoff_ms: 10 }").unwrap();
    let policy = config.refresh.policy();
    assert_eq!(policy.attempts, 1);
    assert_eq!(policy.backoff, Duration::from_millis(10));
  }

  #[test]
  fn test_api_url_validation() {
    let mut api = ApiConfig::default();
    assert!(api.url().is_ok());

    api.url = "ftp://example.com/history".to_string();
    assert!(api.url().is_err());

    api.url = "not a url".to_string();
    assert!(api.url().is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
