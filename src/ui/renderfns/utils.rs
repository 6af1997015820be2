use ratatui::prelude::Color;

use crate::app::StatusLevel;
use crate::cache::CacheSource;

/// Format a count with thousands separators, e.g. 1234567 -> "1,234,567"
pub fn format_count(value: u64) -> String {
  let digits = value.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

/// Get the display color for where the data came from
pub fn source_color(source: CacheSource) -> Color {
  match source {
    CacheSource::Network => Color::Green,
    CacheSource::CacheFresh => Color::Cyan,
    CacheSource::Offline => Color::Yellow,
  }
}

/// Get the display color for a status line
pub fn status_color(level: StatusLevel) -> Color {
  match level {
    StatusLevel::Info => Color::White,
    StatusLevel::Warning => Color::Yellow,
    StatusLevel::Error => Color::Red,
  }
}
