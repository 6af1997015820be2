use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::{CacheError, CacheResult, Metric, SeriesEntry};

/// Outcome of one series request made by the dashboard
#[derive(Debug)]
pub struct SeriesLoaded {
  /// Sequence number of the request, so late answers can be dropped
  pub request: u64,
  pub country: String,
  pub metric: Metric,
  pub result: Result<CacheResult<Vec<SeriesEntry>>, LoadError>,
}

/// Failure reported back to the UI thread
#[derive(Debug, Clone)]
pub struct LoadError {
  pub message: String,
  /// Local storage fault rather than an unreachable source
  pub storage: bool,
}

impl From<CacheError> for LoadError {
  fn from(err: CacheError) -> Self {
    Self {
      storage: err.is_storage(),
      message: err.to_string(),
    }
  }
}

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh
  Tick,
  /// A background series request finished
  Series(Box<SeriesLoaded>),
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Terminal polling blocks, so keep it off the async workers
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          if key.kind == KeyEventKind::Press && input_tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if input_tx.send(Event::Tick).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Sender for background tasks to report back on
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
