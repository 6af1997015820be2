mod app;
mod cache;
mod config;
mod countries;
mod db;
mod event;
mod logging;
mod source;
mod ui;

use clap::Parser;
use color_eyre::Result;
use futures::future::join_all;
use std::path::PathBuf;
use tracing::{error, info};

use cache::{CacheLayer, Metric, SqliteStorage};
use db::Database;
use logging::LogTarget;
use source::HistoryClient;

#[derive(Parser, Debug)]
#[command(name = "covid-dash")]
#[command(about = "Terminal dashboard for COVID-19 history per country, cached in SQLite")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/covid-dash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Metric to show
  #[arg(short, long, value_enum)]
  metric: Option<Metric>,

  /// Print the series as CSV instead of starting the dashboard
  #[arg(short, long)]
  print: bool,

  /// List cached tables and exit
  #[arg(long)]
  list_cached: bool,

  /// Countries to load; the first one opens in the dashboard
  countries: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(metric) = args.metric {
    config.default_metric = metric;
  }
  if let Some(country) = args.countries.first() {
    config.default_country = country.clone();
  }

  let headless = args.print || args.list_cached;
  let target = if headless {
    LogTarget::Stderr
  } else {
    LogTarget::File
  };
  let _log_guard = logging::init(target, &config.log_level)?;

  let storage = SqliteStorage::new(Database::open(config.database.as_deref())?);
  let client = HistoryClient::new(&config.api)?;
  let cache = CacheLayer::new(storage, client).with_policy(config.refresh.policy());

  if args.list_cached {
    for table in cache.cached_tables()? {
      println!("{}", table);
    }
    return Ok(());
  }

  if args.print {
    let countries = if args.countries.is_empty() {
      vec![config.default_country.clone()]
    } else {
      args.countries
    };
    return print_series(&cache, &countries, config.default_metric).await;
  }

  info!(country = %config.default_country, "starting dashboard");
  let mut app = app::App::new(&config, cache);
  app.run().await?;

  Ok(())
}

/// Write `country,metric,date,value` rows for every country to stdout.
///
/// Countries are fetched concurrently; a country that fails is reported on
/// stderr and the rest are still printed.
async fn print_series(cache: &app::Cache, countries: &[String], metric: Metric) -> Result<()> {
  let results = join_all(
    countries
      .iter()
      .map(|country| cache.get_series(country, metric)),
  )
  .await;

  println!("country,metric,date,value");
  let mut failed = 0;
  for (country, result) in countries.iter().zip(results) {
    match result {
      Ok(series) => {
        for entry in series {
          println!(
            "{},{},{},{}",
            csv_field(country),
            metric.status(),
            entry.date,
            entry.value
          );
        }
      }
      Err(e) => {
        error!(country = %country, error = %e, "failed to load series");
        failed += 1;
      }
    }
  }

  if failed == countries.len() && failed > 0 {
    return Err(color_eyre::eyre::eyre!("No series could be loaded"));
  }
  Ok(())
}

/// Quote a CSV field when it contains a separator or quote
fn csv_field(value: &str) -> String {
  if value.contains([',', '"', '\n']) {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_string()
  }
}
