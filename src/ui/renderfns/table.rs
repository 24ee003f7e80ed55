use super::utils::{pad, status_color};
use crate::resources::{Column, Status};
use ratatui::prelude::*;

/// Column titles, padded to the column widths
pub fn header_line(columns: &[Column]) -> Line<'static> {
  let spans: Vec<Span> = columns
    .iter()
    .flat_map(|c| {
      [
        Span::styled(pad(c.title, c.width as usize), Style::default().fg(Color::DarkGray).bold()),
        Span::raw(" "),
      ]
    })
    .collect();
  Line::from(spans)
}

/// One record's cells, padded to the column widths. The first cell is the key column.
pub fn row_line(cells: &[String], columns: &[Column]) -> Line<'static> {
  let spans: Vec<Span> = cells
    .iter()
    .zip(columns)
    .enumerate()
    .flat_map(|(i, (cell, column))| {
      [
        Span::styled(pad(cell, column.width as usize), cell_style(i, cell)),
        Span::raw(" "),
      ]
    })
    .collect();
  Line::from(spans)
}

fn cell_style(index: usize, cell: &str) -> Style {
  match cell {
    "Active" => Style::default().fg(status_color(Status::Active)),
    "Inactive" => Style::default().fg(status_color(Status::Inactive)),
    _ if index == 0 => Style::default().fg(Color::Cyan),
    _ => Style::default(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const COLUMNS: &[Column] = &[Column::new("Name", 6), Column::new("Status", 8)];

  #[test]
  fn test_row_line_pads_cells() {
    let line = row_line(&["VIP".to_string(), "Active".to_string()], COLUMNS);
    assert_eq!(line.spans[0].content, "VIP   ");
    assert_eq!(line.spans[2].content, "Active  ");
    assert_eq!(line.spans[2].style.fg, Some(Color::Green));
  }

  #[test]
  fn test_header_line() {
    let line = header_line(COLUMNS);
    assert_eq!(line.spans.len(), 4);
    assert_eq!(line.spans[0].content, "Name  ");
  }
}
