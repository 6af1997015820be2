use chrono::NaiveDate;
use ratatui::prelude::*;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};

use crate::app::ChartMode;
use crate::cache::{Metric, SeriesEntry};
use crate::ui::renderfns::utils::format_count;

const MAX_BAR_WIDTH: u16 = 9;

/// Values to plot for `mode`, one per day.
///
/// Daily mode starts at the second entry; a running total that goes down
/// (source corrections) plots as zero.
pub fn points(series: &[SeriesEntry], mode: ChartMode) -> Vec<(NaiveDate, u64)> {
  match mode {
    ChartMode::Cumulative => series.iter().map(|e| (e.date, e.value)).collect(),
    ChartMode::Daily => series
      .windows(2)
      .map(|pair| (pair[1].date, pair[1].value.saturating_sub(pair[0].value)))
      .collect(),
  }
}

/// Merge consecutive days so at most `max_bars` remain.
///
/// Each bucket is labelled with its last day. Cumulative buckets keep the
/// last running total; daily buckets sum their days.
pub fn bucket(
  points: &[(NaiveDate, u64)],
  max_bars: usize,
  mode: ChartMode,
) -> Vec<(NaiveDate, u64)> {
  if max_bars == 0 || points.is_empty() {
    return Vec::new();
  }
  if points.len() <= max_bars {
    return points.to_vec();
  }

  let size = points.len().div_ceil(max_bars);
  points
    .chunks(size)
    .filter_map(|chunk| {
      let (last_date, last_value) = *chunk.last()?;
      let value = match mode {
        ChartMode::Cumulative => last_value,
        ChartMode::Daily => chunk.iter().map(|(_, v)| *v).sum(),
      };
      Some((last_date, value))
    })
    .collect()
}

/// Width and gap for `bars` bars in `inner_width` columns.
fn bar_layout(inner_width: u16, bars: usize) -> (u16, u16) {
  let bars = bars.max(1) as u16;
  let width = (inner_width / bars).clamp(1, MAX_BAR_WIDTH + 1);
  if width >= 3 {
    (width - 1, 1)
  } else {
    (width, 0)
  }
}

/// Placeholder text when there is nothing to plot.
fn empty_message(entries: usize, mode: ChartMode, loading: bool) -> &'static str {
  if loading {
    ""
  } else if entries == 1 && mode == ChartMode::Daily {
    "Need two days of data for the daily view (press <d> for totals)."
  } else {
    "No data to display."
  }
}

pub fn draw_series_chart(
  frame: &mut Frame,
  area: Rect,
  country: &str,
  metric: Metric,
  series: &[SeriesEntry],
  mode: ChartMode,
  loading: bool,
) {
  let mode_label = match mode {
    ChartMode::Cumulative => "cumulative",
    ChartMode::Daily => "daily",
  };
  let title = if loading {
    format!(" {} · {} ({}, loading...) ", country, metric, mode_label)
  } else {
    format!(" {} · {} ({}) ", country, metric, mode_label)
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let inner = block.inner(area);
  let plotted = bucket(&points(series, mode), inner.width as usize, mode);

  if plotted.is_empty() {
    let content = empty_message(series.len(), mode, loading);
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  frame.render_widget(block, area);

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Min(1),    // Bars
      Constraint::Length(1), // Date axis
    ])
    .split(inner);

  let bars: Vec<Bar> = plotted
    .iter()
    .map(|(_, value)| {
      Bar::default()
        .value(*value)
        .text_value(String::new())
        .style(Style::default().fg(Color::Red))
    })
    .collect();

  let (bar_width, bar_gap) = bar_layout(inner.width, bars.len());
  let chart = BarChart::default()
    .data(BarGroup::default().bars(&bars))
    .bar_width(bar_width)
    .bar_gap(bar_gap);
  frame.render_widget(chart, chunks[0]);

  let peak = plotted.iter().map(|(_, v)| *v).max().unwrap_or(0);
  let (first, _) = plotted[0];
  let (last, _) = plotted[plotted.len() - 1];
  let axis = Line::from(vec![
    Span::styled(first.to_string(), Style::default().fg(Color::DarkGray)),
    Span::raw("  "),
    Span::styled(
      format!("peak {}", format_count(peak)),
      Style::default().fg(Color::Yellow),
    ),
    Span::raw("  "),
    Span::styled(last.to_string(), Style::default().fg(Color::DarkGray)),
  ]);
  frame.render_widget(Paragraph::new(axis).alignment(Alignment::Center), chunks[1]);
}
