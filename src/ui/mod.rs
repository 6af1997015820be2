pub mod components;
mod renderfns;
mod views;

use crate::app::{Dashboard, Mode};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use renderfns::utils::status_color;

/// Suggestions shown under the country box while editing
const MAX_SUGGESTIONS: usize = 6;

/// Main draw function
pub fn draw(frame: &mut Frame, dashboard: &Dashboard) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Length(3), // Country input
      Constraint::Min(1),    // Chart
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  renderfns::draw_header(frame, chunks[0], dashboard);
  draw_country_input(frame, chunks[1], dashboard);
  views::draw_series_chart(
    frame,
    chunks[2],
    dashboard.country(),
    dashboard.metric(),
    dashboard.series(),
    dashboard.chart_mode(),
    dashboard.is_loading(),
  );
  draw_status_bar(frame, chunks[3], dashboard);
}

fn draw_country_input(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
  let editing = dashboard.mode() == Mode::Editing;
  let border = if editing { Color::Yellow } else { Color::DarkGray };

  let block = Block::default()
    .title(" Country ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  let line = if editing {
    let mut spans = vec![Span::raw(dashboard.input().value())];
    let suggestions = dashboard.suggestions();
    if !suggestions.is_empty() {
      spans.push(Span::raw("   "));
      spans.push(Span::styled(
        suggestions
          .into_iter()
          .take(MAX_SUGGESTIONS)
          .collect::<Vec<_>>()
          .join(" · "),
        Style::default().fg(Color::DarkGray),
      ));
    }
    Line::from(spans)
  } else {
    Line::from(Span::styled(
      "press <i> to choose a country",
      Style::default().fg(Color::DarkGray),
    ))
  };

  let inner = block.inner(area);
  frame.render_widget(Paragraph::new(line).block(block), area);

  if editing {
    let offset = dashboard.input().cursor_position() as u16;
    frame.set_cursor_position((inner.x + offset.min(inner.width), inner.y));
  }
}

fn draw_status_bar(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
  let status = dashboard.status();
  let mut content = String::from(" ");
  if dashboard.is_loading() {
    content.push_str("⟳ ");
  }
  content.push_str(&status.message);

  let paragraph = Paragraph::new(content).style(Style::default().fg(status_color(status.level)));
  frame.render_widget(paragraph, area);
}
