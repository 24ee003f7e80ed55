use crate::panel::Notification;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::utils::level_color;

/// Draw the footer bar with view breadcrumb
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String]) {
  let mut spans = Vec::new();

  spans.push(Span::raw(" "));

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let line = Line::from(spans);
  let paragraph = Paragraph::new(line).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// One-line flash message at the bottom of `area`. Returns the space left above it.
pub fn draw_notification(frame: &mut Frame, area: Rect, notification: Option<&Notification>) -> Rect {
  let Some(notification) = notification else {
    return area;
  };
  if area.height < 2 {
    return area;
  }

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Min(0), Constraint::Length(1)])
    .split(area);

  let line = Line::from(vec![
    Span::styled(
      format!(" {} ", notification.message),
      Style::default().fg(level_color(notification.level)).bold(),
    ),
    Span::styled(" <esc> dismiss", Style::default().fg(Color::DarkGray)),
  ]);
  frame.render_widget(Paragraph::new(line), chunks[1]);
  chunks[0]
}
