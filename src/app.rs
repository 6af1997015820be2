use crate::cache::{CacheLayer, CacheSource, Metric, SeriesEntry, SqliteStorage};
use crate::config::Config;
use crate::countries;
use crate::event::{Event, EventHandler, LoadError, SeriesLoaded};
use crate::source::HistoryClient;
use crate::ui;
use crate::ui::components::input::{InputResult, TextInput};
use chrono::NaiveDate;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// The cache stack used by the dashboard
pub type Cache = CacheLayer<SqliteStorage, HistoryClient>;

/// Input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Editing,
}

/// How the series is plotted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartMode {
  /// Running totals as reported by the source
  Cumulative,
  /// Day-over-day increase
  Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
  Info,
  Warning,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
  pub level: StatusLevel,
  pub message: String,
}

impl Status {
  fn new(level: StatusLevel, message: impl Into<String>) -> Self {
    Self {
      level,
      message: message.into(),
    }
  }
}

/// What the runner should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  None,
  Load,
  Quit,
}

/// Everything the dashboard shows, independent of the terminal and network
pub struct Dashboard {
  countries: Vec<String>,
  mode: Mode,
  input: TextInput,
  completions: Vec<String>,
  completion: usize,
  country: String,
  metric: Metric,
  chart_mode: ChartMode,
  series: Vec<SeriesEntry>,
  source: Option<CacheSource>,
  latest: Option<NaiveDate>,
  loading: bool,
  request: u64,
  status: Status,
}

impl Dashboard {
  pub fn new(config: &Config) -> Self {
    let country = countries::canonical(&config.countries, &config.default_country)
      .unwrap_or(config.default_country.as_str())
      .to_string();

    Self {
      countries: config.countries.clone(),
      mode: Mode::Normal,
      input: TextInput::new(),
      completions: Vec::new(),
      completion: 0,
      country,
      metric: config.default_metric,
      chart_mode: ChartMode::Cumulative,
      series: Vec::new(),
      source: None,
      latest: None,
      loading: false,
      request: 0,
      status: Status::new(StatusLevel::Info, "Enter a country and press Enter"),
    }
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn input(&self) -> &TextInput {
    &self.input
  }

  pub fn country(&self) -> &str {
    &self.country
  }

  pub fn metric(&self) -> Metric {
    self.metric
  }

  pub fn chart_mode(&self) -> ChartMode {
    self.chart_mode
  }

  pub fn series(&self) -> &[SeriesEntry] {
    &self.series
  }

  pub fn source(&self) -> Option<CacheSource> {
    self.source
  }

  pub fn latest(&self) -> Option<NaiveDate> {
    self.latest
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn status(&self) -> &Status {
    &self.status
  }

  /// Suggestions for the text currently in the input box
  pub fn suggestions(&self) -> Vec<&str> {
    countries::suggestions(&self.countries, &self.input.value())
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      return Action::Quit;
    }

    match self.mode {
      Mode::Normal => self.handle_normal_key(key),
      Mode::Editing => self.handle_editing_key(key),
    }
  }

  fn handle_normal_key(&mut self, key: KeyEvent) -> Action {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
      KeyCode::Char('i') | KeyCode::Char('/') | KeyCode::Enter => {
        self.mode = Mode::Editing;
        self.input.clear();
        self.completions.clear();
        Action::None
      }
      KeyCode::Char('m') => {
        self.metric = self.metric.toggle();
        Action::Load
      }
      KeyCode::Char('d') => {
        self.chart_mode = match self.chart_mode {
          ChartMode::Cumulative => ChartMode::Daily,
          ChartMode::Daily => ChartMode::Cumulative,
        };
        Action::None
      }
      KeyCode::Char('r') => Action::Load,
      _ => Action::None,
    }
  }

  fn handle_editing_key(&mut self, key: KeyEvent) -> Action {
    if key.code == KeyCode::Tab {
      self.complete();
      return Action::None;
    }
    self.completions.clear();

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.mode = Mode::Normal;
        self.submit(&value)
      }
      InputResult::Cancelled => {
        self.mode = Mode::Normal;
        self.input.clear();
        Action::None
      }
      InputResult::Consumed | InputResult::NotHandled => Action::None,
    }
  }

  /// Replace the input with the next suggestion, cycling on repeated Tab
  fn complete(&mut self) {
    if self.completions.is_empty() {
      self.completions = self.suggestions().into_iter().map(String::from).collect();
      self.completion = 0;
    } else {
      self.completion = (self.completion + 1) % self.completions.len();
    }

    if let Some(choice) = self.completions.get(self.completion) {
      self.input.set_value(choice);
    }
  }

  fn submit(&mut self, value: &str) -> Action {
    if value.trim().is_empty() {
      return Action::None;
    }

    // The cache accepts any name; the dashboard only asks for listed ones.
    match countries::canonical(&self.countries, value) {
      Some(country) => {
        self.country = country.to_string();
        Action::Load
      }
      None => {
        self.status = Status::new(
          StatusLevel::Warning,
          format!("Unknown country \"{}\" (Tab to autocomplete)", value.trim()),
        );
        Action::None
      }
    }
  }

  /// Mark a new request as in flight and return its parameters
  pub fn begin_load(&mut self) -> (u64, String, Metric) {
    self.request += 1;
    self.loading = true;
    self.status = Status::new(
      StatusLevel::Info,
      format!("Loading {} for {}...", self.metric, self.country),
    );
    (self.request, self.country.clone(), self.metric)
  }

  /// Apply a finished request. Answers to superseded requests are dropped.
  pub fn apply(&mut self, loaded: SeriesLoaded) {
    if loaded.request != self.request {
      debug!(request = loaded.request, "dropping superseded series response");
      return;
    }
    self.loading = false;

    match loaded.result {
      Ok(result) => {
        self.source = Some(result.source);
        self.latest = result.latest;
        self.series = result.data;

        self.status = if self.series.is_empty() {
          Status::new(
            StatusLevel::Info,
            format!("No data to display for \"{}\"", loaded.country),
          )
        } else if result.source == CacheSource::Offline {
          Status::new(
            StatusLevel::Warning,
            format!(
              "Source unreachable, showing cached data for \"{}\"",
              loaded.country
            ),
          )
        } else {
          Status::new(
            StatusLevel::Info,
            format!(
              "Here are the covid-19 {} stats for \"{}\"",
              loaded.metric.status(),
              loaded.country
            ),
          )
        };
      }
      Err(LoadError { message, storage }) => {
        self.series.clear();
        self.source = None;
        self.latest = None;
        self.status = if storage {
          Status::new(StatusLevel::Error, format!("Storage failure: {}", message))
        } else {
          Status::new(StatusLevel::Warning, format!("No data: {}", message))
        };
      }
    }
  }
}

/// Main application: owns the terminal loop and the cache
pub struct App {
  dashboard: Dashboard,
  cache: Cache,
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, cache: Cache) -> Self {
    Self {
      dashboard: Dashboard::new(config),
      cache,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));
    let tx = events.sender();

    // Initial data load
    self.load(&tx);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, &self.dashboard))?;

      match events.next().await {
        Some(Event::Key(key)) => match self.dashboard.handle_key(key) {
          Action::Load => self.load(&tx),
          Action::Quit => self.should_quit = true,
          Action::None => {}
        },
        Some(Event::Tick) => {}
        Some(Event::Series(loaded)) => self.dashboard.apply(*loaded),
        None => self.should_quit = true,
      }
    }

    Ok(())
  }

  fn load(&mut self, tx: &mpsc::UnboundedSender<Event>) {
    let (request, country, metric) = self.dashboard.begin_load();
    let cache = self.cache.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
      let result = cache
        .fetch_series(&country, metric)
        .await
        .map_err(LoadError::from);
      let _ = tx.send(Event::Series(Box::new(SeriesLoaded {
        request,
        country,
        metric,
        result,
      })));
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheResult;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_text(dashboard: &mut Dashboard, text: &str) {
    for c in text.chars() {
      dashboard.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  fn loaded(
    request: u64,
    result: Result<CacheResult<Vec<SeriesEntry>>, LoadError>,
  ) -> SeriesLoaded {
    SeriesLoaded {
      request,
      country: "South Africa".to_string(),
      metric: Metric::Deaths,
      result,
    }
  }

  #[test]
  fn test_default_country_from_config() {
    let dashboard = Dashboard::new(&Config::default());
    assert_eq!(dashboard.country(), "South Africa");
    assert_eq!(dashboard.metric(), Metric::Deaths);
    assert_eq!(dashboard.mode(), Mode::Normal);
  }

  #[test]
  fn test_submit_known_country_loads() {
    let mut dashboard = Dashboard::new(&Config::default());
    dashboard.handle_key(key(KeyCode::Char('i')));
    assert_eq!(dashboard.mode(), Mode::Editing);

    type_text(&mut dashboard, "italy");
    let action = dashboard.handle_key(key(KeyCode::Enter));

    assert_eq!(action, Action::Load);
    assert_eq!(dashboard.country(), "Italy");
    assert_eq!(dashboard.mode(), Mode::Normal);
  }

  #[test]
  fn test_submit_unknown_country_is_rejected() {
    let mut dashboard = Dashboard::new(&Config::default());
    dashboard.handle_key(key(KeyCode::Char('i')));
    type_text(&mut dashboard, "Lalaland");
    let action = dashboard.handle_key(key(KeyCode::Enter));

    assert_eq!(action, Action::None);
    assert_eq!(dashboard.country(), "South Africa");
    assert_eq!(dashboard.status().level, StatusLevel::Warning);
  }

  #[test]
  fn test_tab_cycles_completions() {
    let mut dashboard = Dashboard::new(&Config::default());
    dashboard.handle_key(key(KeyCode::Char('i')));
    type_text(&mut dashboard, "niger");

    dashboard.handle_key(key(KeyCode::Tab));
    assert_eq!(dashboard.input().value(), "Niger");
    dashboard.handle_key(key(KeyCode::Tab));
    assert_eq!(dashboard.input().value(), "Nigeria");
    dashboard.handle_key(key(KeyCode::Tab));
    assert_eq!(dashboard.input().value(), "Niger");
  }

  #[test]
  fn test_escape_cancels_editing() {
    let mut dashboard = Dashboard::new(&Config::default());
    dashboard.handle_key(key(KeyCode::Char('i')));
    type_text(&mut dashboard, "Ita");
    let action = dashboard.handle_key(key(KeyCode::Esc));

    assert_eq!(action, Action::None);
    assert_eq!(dashboard.mode(), Mode::Normal);
    assert!(dashboard.input().is_empty());
  }

  #[test]
  fn test_quit_keys() {
    let mut dashboard = Dashboard::new(&Config::default());
    assert_eq!(dashboard.handle_key(key(KeyCode::Char('q'))), Action::Quit);

    dashboard.handle_key(key(KeyCode::Char('i')));
    let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
    assert_eq!(dashboard.handle_key(ctrl_c), Action::Quit);
  }

  #[test]
  fn test_metric_toggle_reloads() {
    let mut dashboard = Dashboard::new(&Config::default());
    assert_eq!(dashboard.handle_key(key(KeyCode::Char('m'))), Action::Load);
    assert_eq!(dashboard.metric(), Metric::Recovered);
  }

  #[test]
  fn test_chart_mode_toggle() {
    let mut dashboard = Dashboard::new(&Config::default());
    assert_eq!(dashboard.handle_key(key(KeyCode::Char('d'))), Action::None);
    assert_eq!(dashboard.chart_mode(), ChartMode::Daily);
  }

  #[test]
  fn test_apply_series() {
    let mut dashboard = Dashboard::new(&Config::default());
    let (request, _, _) = dashboard.begin_load();
    assert!(dashboard.is_loading());

    let data = vec![SeriesEntry::new(date("2024-03-09"), 3)];
    dashboard.apply(loaded(
      request,
      Ok(CacheResult::new(
        data.clone(),
        CacheSource::Network,
        Some(date("2024-03-09")),
      )),
    ));

    assert!(!dashboard.is_loading());
    assert_eq!(dashboard.series(), data.as_slice());
    assert_eq!(dashboard.source(), Some(CacheSource::Network));
    assert_eq!(dashboard.latest(), Some(date("2024-03-09")));
    assert!(dashboard.status().message.contains("South Africa"));
  }

  #[test]
  fn test_empty_series_is_not_an_error() {
    let mut dashboard = Dashboard::new(&Config::default());
    let (request, _, _) = dashboard.begin_load();
    dashboard.apply(loaded(
      request,
      Ok(CacheResult::new(Vec::new(), CacheSource::Network, None)),
    ));

    assert_eq!(dashboard.status().level, StatusLevel::Info);
    assert!(dashboard.status().message.starts_with("No data to display"));
  }

  #[test]
  fn test_storage_error_is_hard_failure() {
    let mut dashboard = Dashboard::new(&Config::default());
    let (request, _, _) = dashboard.begin_load();
    dashboard.apply(loaded(
      request,
      Err(LoadError {
        message: "disk I/O error".to_string(),
        storage: true,
      }),
    ));

    assert_eq!(dashboard.status().level, StatusLevel::Error);
    assert!(dashboard.series().is_empty());
  }

  #[test]
  fn test_offline_result_warns() {
    let mut dashboard = Dashboard::new(&Config::default());
    let (request, _, _) = dashboard.begin_load();
    dashboard.apply(loaded(
      request,
      Ok(CacheResult::new(
        vec![SeriesEntry::new(date("2024-03-01"), 1)],
        CacheSource::Offline,
        Some(date("2024-03-01")),
      )),
    ));

    assert_eq!(dashboard.status().level, StatusLevel::Warning);
    assert_eq!(dashboard.series().len(), 1);
  }

  #[test]
  fn test_superseded_response_is_dropped() {
    let mut dashboard = Dashboard::new(&Config::default());
    let (first, _, _) = dashboard.begin_load();
    let _second = dashboard.begin_load();

    dashboard.apply(loaded(
      first,
      Ok(CacheResult::new(
        vec![SeriesEntry::new(date("2024-03-01"), 1)],
        CacheSource::Network,
        None,
      )),
    ));

    assert!(dashboard.is_loading());
    assert!(dashboard.series().is_empty());
  }
}
