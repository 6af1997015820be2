use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Dashboard;
use crate::ui::renderfns::utils::source_color;

/// Draw the header bar with logo, current series, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
  let mut spans = vec![
    Span::styled(" covid-dash ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", dashboard.country()),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", dashboard.metric()),
      Style::default().fg(Color::White),
    ),
  ];

  if let Some(source) = dashboard.source() {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", source.label()),
      Style::default().fg(source_color(source)),
    ));
  }
  if let Some(latest) = dashboard.latest() {
    spans.push(Span::styled(
      format!("through {} ", latest),
      Style::default().fg(Color::DarkGray),
    ));
  }

  spans.push(Span::raw(" "));
  for (key, label) in SHORTCUTS {
    // Shortcuts - keys highlighted, descriptions dimmed
    spans.push(Span::styled(format!("<{}>", key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(
      format!(" {}  ", label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

const SHORTCUTS: &[(&str, &str)] = &[
  ("i", "country"),
  ("m", "metric"),
  ("d", "daily/total"),
  ("r", "reload"),
  ("q", "quit"),
];
