//! Serde-deserializable types matching the history API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Body of `GET /v1/history?country=..&status=..`.
///
/// Unknown countries come back without the `All` aggregate.
#[derive(Debug, Deserialize)]
pub struct ApiHistoryResponse {
  #[serde(rename = "All")]
  pub all: Option<ApiAggregate>,
}

/// Country-wide aggregate. The API also returns population, capital, etc.
#[derive(Debug, Deserialize)]
pub struct ApiAggregate {
  #[serde(default)]
  pub country: Option<String>,
  pub dates: Option<BTreeMap<String, i64>>,
}
