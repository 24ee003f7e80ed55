use crate::panel::Level;
use crate::resources::Status;
use ratatui::prelude::{Color, Rect};

/// Truncate a string to a maximum length in characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Truncate and left-align into a fixed-width table cell
pub fn pad(s: &str, width: usize) -> String {
  format!("{:<width$}", truncate(s, width), width = width)
}

/// Get the display color for an Active/Inactive status
pub fn status_color(status: Status) -> Color {
  match status {
    Status::Active => Color::Green,
    Status::Inactive => Color::DarkGray,
  }
}

pub fn level_color(level: Level) -> Color {
  match level {
    Level::Success => Color::Green,
    Level::Error => Color::Red,
  }
}

/// Rect of at most `width` x `height` centered in `area`
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  let x = area.x + (area.width - width) / 2;
  let y = area.y + (area.height - height) / 2;
  Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Zürich–Genève office", 9), "Zürich...");
  }

  #[test]
  fn test_pad() {
    assert_eq!(pad("VIP", 6), "VIP   ");
    assert_eq!(pad("Student visa", 8), "Stude...");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color(Status::Active), Color::Green);
    assert_eq!(status_color(Status::Inactive), Color::DarkGray);
  }

  #[test]
  fn test_centered_rect_clamps() {
    let area = Rect::new(0, 0, 40, 10);
    assert_eq!(centered_rect(area, 20, 4), Rect::new(10, 3, 20, 4));
    assert_eq!(centered_rect(area, 80, 40), area);
  }
}
