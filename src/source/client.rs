use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::api_types::ApiHistoryResponse;
use super::{FetchOutcome, SeriesSource, SourceError};
use crate::cache::Metric;
use crate::config::ApiConfig;

/// HTTP client for the COVID-19 history API.
#[derive(Clone)]
pub struct HistoryClient {
  client: reqwest::Client,
  base_url: Url,
}

impl HistoryClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = config.url()?;

    let client = reqwest::Client::builder()
      .user_agent(concat!("covid-dash/", env!("CARGO_PKG_VERSION")))
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }
}

impl SeriesSource for HistoryClient {
  async fn fetch(&self, country: &str, metric: Metric) -> Result<FetchOutcome, SourceError> {
    debug!(country, status = metric.status(), url = %self.base_url, "fetching history");

    let response = self
      .client
      .get(self.base_url.clone())
      .query(&[("country", country), ("status", metric.status())])
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return if is_transport_failure(status) {
        Err(SourceError::Status(status.as_u16()))
      } else {
        debug!(country, status = status.as_u16(), "history not found");
        Ok(FetchOutcome::Unavailable)
      };
    }

    let body = response.text().await?;
    Ok(parse_history(&body))
  }
}

/// Server-side failures and throttling are retryable transport errors; any
/// other non-success status means the source has nothing for this request.
fn is_transport_failure(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Convert a history response body into a series.
///
/// A body that isn't JSON, or lacks the `All.dates` mapping, is `Unavailable`.
/// Individual entries with an unparseable date or a negative count are skipped.
pub fn parse_history(body: &str) -> FetchOutcome {
  let response: ApiHistoryResponse = match serde_json::from_str(body) {
    Ok(r) => r,
    Err(e) => {
      warn!("malformed history payload: {}", e);
      return FetchOutcome::Unavailable;
    }
  };

  let Some(aggregate) = response.all else {
    return FetchOutcome::Unavailable;
  };
  let Some(dates) = aggregate.dates else {
    return FetchOutcome::Unavailable;
  };

  let mut series = BTreeMap::new();
  for (raw_date, count) in dates {
    let Ok(date) = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d") else {
      warn!(date = %raw_date, "skipping entry with unparseable date");
      continue;
    };
    let Ok(count) = u64::try_from(count) else {
      warn!(date = %raw_date, count, "skipping negative count");
      continue;
    };
    series.insert(date, count);
  }

  debug!(
    country = aggregate.country.as_deref().unwrap_or("?"),
    days = series.len(),
    "parsed history"
  );

  FetchOutcome::Found(series)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Arc, Mutex};
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  #[test]
  fn test_parse_history_found() {
    let body = r#"{
      "All": {
        "country": "South Africa",
        "population": 56717156,
        "dates": { "2021-01-02": 7, "2021-01-01": 5 }
      }
    }"#;

    let FetchOutcome::Found(series) = parse_history(body) else {
      panic!("expected a series");
    };
    let entries: Vec<_> = series.into_iter().collect();
    assert_eq!(entries, vec![(date("2021-01-01"), 5), (date("2021-01-02"), 7)]);
  }

  #[test]
  fn test_parse_history_unknown_country() {
    assert_eq!(parse_history("{}"), FetchOutcome::Unavailable);
  }

  #[test]
  fn test_parse_history_missing_dates() {
    let body = r#"{ "All": { "country": "South Africa" } }"#;
    assert_eq!(parse_history(body), FetchOutcome::Unavailable);
  }

  #[test]
  fn test_parse_history_malformed_json() {
    assert_eq!(parse_history("<html>oops</html>"), FetchOutcome::Unavailable);
  }

  #[test]
  fn test_parse_history_empty_dates() {
    let body = r#"{ "All": { "dates": {} } }"#;
    assert_eq!(parse_history(body), FetchOutcome::Found(BTreeMap::new()));
  }

  #[test]
  fn test_parse_history_skips_bad_entries() {
    let body = r#"{ "All": { "dates": {
      "2021-01-01": 5,
      "yesterday": 6,
      "2021-01-03": -1
    } } }"#;

    let FetchOutcome::Found(series) = parse_history(body) else {
      panic!("expected a series");
    };
    assert_eq!(series.len(), 1);
    assert_eq!(series.get(&date("2021-01-01")), Some(&5));
  }

  /// Serve canned responses by country and record every request target.
  async fn stub_server() -> (ApiConfig, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let targets = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&targets);

    tokio::spawn(async move {
      loop {
        let (mut stream, _) = match listener.accept().await {
          Ok(v) => v,
          Err(_) => break,
        };
        let mut req = vec![0u8; 8192];
        let n = stream.read(&mut req).await.unwrap_or(0);
        let req_text = String::from_utf8_lossy(&req[..n]);
        let target = req_text
          .lines()
          .next()
          .unwrap_or_default()
          .split_whitespace()
          .nth(1)
          .unwrap_or_default()
          .to_string();
        seen.lock().unwrap().push(target.clone());

        let (status, body) = if target.contains("country=Italy&") {
          ("200 OK", r#"{"All":{"country":"Italy","dates":{"2021-01-02":7,"2021-01-01":5}}}"#)
        } else if target.contains("country=Down&") {
          ("503 Service Unavailable", "")
        } else if target.contains("country=Busy&") {
          ("429 Too Many Requests", "")
        } else {
          ("404 Not Found", "")
        };
        let response = format!(
          "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
          status,
          body.len(),
          body
        );
        let _ = stream.write_all(response.as_bytes()).await;
      }
    });

    let config = ApiConfig {
      url: format!("http://{}/v1/history", addr),
      timeout_secs: 5,
    };
    (config, targets)
  }

  #[tokio::test]
  async fn test_fetch_sends_country_and_status() {
    let (config, targets) = stub_server().await;
    let client = HistoryClient::new(&config).unwrap();

    let outcome = client.fetch("Italy", Metric::Recovered).await.unwrap();

    let FetchOutcome::Found(series) = outcome else {
      panic!("expected a series");
    };
    assert_eq!(series.len(), 2);
    assert_eq!(series.get(&date("2021-01-02")), Some(&7));
    assert_eq!(
      targets.lock().unwrap().as_slice(),
      ["/v1/history?country=Italy&status=recovered"]
    );
  }

  #[tokio::test]
  async fn test_fetch_encodes_country_name() {
    let (config, targets) = stub_server().await;
    let client = HistoryClient::new(&config).unwrap();

    client.fetch("South Africa", Metric::Deaths).await.unwrap();

    assert_eq!(
      targets.lock().unwrap().as_slice(),
      ["/v1/history?country=South+Africa&status=deaths"]
    );
  }

  #[tokio::test]
  async fn test_fetch_not_found_is_unavailable() {
    let (config, _) = stub_server().await;
    let client = HistoryClient::new(&config).unwrap();

    let outcome = client.fetch("Lalaland", Metric::Deaths).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Unavailable);
  }

  #[tokio::test]
  async fn test_fetch_server_errors_are_transport_failures() {
    let (config, _) = stub_server().await;
    let client = HistoryClient::new(&config).unwrap();

    let down = client.fetch("Down", Metric::Deaths).await.unwrap_err();
    assert!(matches!(down, SourceError::Status(503)));

    let busy = client.fetch("Busy", Metric::Deaths).await.unwrap_err();
    assert!(matches!(busy, SourceError::Status(429)));
  }

  #[test]
  fn test_transport_failure_classification() {
    assert!(is_transport_failure(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(is_transport_failure(StatusCode::BAD_GATEWAY));
    assert!(is_transport_failure(StatusCode::TOO_MANY_REQUESTS));
    assert!(!is_transport_failure(StatusCode::NOT_FOUND));
    assert!(!is_transport_failure(StatusCode::BAD_REQUEST));
  }
}
