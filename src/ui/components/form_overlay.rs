use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::resources::{FieldKind, FieldSpec, FieldValue, IdSet};
use crate::ui::renderfns::{centered_rect, truncate};
use crate::ui::view::{ShortcutInfo, ShortcutProvider};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const LABEL_WIDTH: usize = 26;

/// Edits requested by the form overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  Set(String, FieldValue),
  AddChild,
  RemoveChild(usize),
  Submit,
  Cancel,
}

/// Modal editor over a draft's field descriptors.
///
/// The overlay holds no draft of its own: it is handed the current
/// `FieldSpec`s on every call and answers with events for the form state.
#[derive(Debug, Clone, Default)]
pub struct FormOverlay {
  selected: usize,
  /// Field name and buffer while a text field is being edited
  editing: Option<(String, TextInput)>,
  /// Option list open over a picker field
  picking: Option<Picker>,
}

#[derive(Debug, Clone)]
struct Picker {
  name: String,
  cursor: usize,
}

impl FormOverlay {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reset(&mut self) {
    self.selected = 0;
    self.editing = None;
    self.picking = None;
  }

  pub fn is_editing(&self) -> bool {
    self.editing.is_some() || self.picking.is_some()
  }

  fn open_picker(&mut self, field: &FieldSpec) {
    let cursor = field
      .options
      .iter()
      .position(|o| o.id == field.value.trim())
      .unwrap_or(0);
    self.picking = Some(Picker {
      name: field.name.clone(),
      cursor,
    });
  }

  /// Space toggles an entry of a multi picker and Enter closes it. A single
  /// picker takes the entry under the cursor on either key.
  fn handle_picker(&mut self, key: KeyEvent, fields: &[FieldSpec]) -> KeyResult<FormEvent> {
    let Some(picker) = &mut self.picking else {
      return KeyResult::NotHandled;
    };
    let Some(field) = fields.iter().find(|f| f.name == picker.name) else {
      self.picking = None;
      return KeyResult::Handled;
    };

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        if picker.cursor + 1 < field.options.len() {
          picker.cursor += 1;
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        picker.cursor = picker.cursor.saturating_sub(1);
        KeyResult::Handled
      }
      KeyCode::Enter | KeyCode::Char(' ') => {
        let Some(option) = field.options.get(picker.cursor) else {
          self.picking = None;
          return KeyResult::Handled;
        };
        match field.kind {
          FieldKind::PickMany(_) if key.code == KeyCode::Enter => {
            self.picking = None;
            KeyResult::Handled
          }
          FieldKind::PickMany(_) => {
            let mut ids = IdSet::parse(&field.name, &field.value).unwrap_or_default();
            match ids.toggle(&field.name, &option.id) {
              Ok(_) => KeyResult::Event(FormEvent::Set(field.name.clone(), FieldValue::Ids(ids))),
              Err(_) => KeyResult::Handled,
            }
          }
          _ => {
            self.picking = None;
            KeyResult::Event(FormEvent::Set(field.name.clone(), FieldValue::text(option.id.as_str())))
          }
        }
      }
      KeyCode::Esc => {
        self.picking = None;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    fields: &[FieldSpec],
    submitting: bool,
  ) -> KeyResult<FormEvent> {
    // Submit affordance and edits are disabled until the result lands
    if submitting {
      return KeyResult::Handled;
    }
    self.selected = self.selected.min(fields.len().saturating_sub(1));

    if let Some((name, input)) = &mut self.editing {
      return match input.handle_key(key) {
        InputResult::Submitted(value) => {
          let name = std::mem::take(name);
          self.editing = None;
          KeyResult::Event(FormEvent::Set(name, FieldValue::Text(value)))
        }
        InputResult::Cancelled => {
          self.editing = None;
          KeyResult::Handled
        }
        InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
      };
    }

    if self.picking.is_some() {
      return self.handle_picker(key, fields);
    }

    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
      return KeyResult::Event(FormEvent::Submit);
    }

    let field = fields.get(self.selected);
    // Pickers fall back to typed ids until their listing has loaded
    if let Some(f) = field.filter(|f| f.kind.lookup().is_some() && !f.options.is_empty()) {
      if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
        self.open_picker(f);
        return KeyResult::Handled;
      }
    }
    match key.code {
      KeyCode::Esc => KeyResult::Event(FormEvent::Cancel),
      KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
        if self.selected + 1 < fields.len() {
          self.selected += 1;
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
        self.selected = self.selected.saturating_sub(1);
        KeyResult::Handled
      }
      KeyCode::Char(' ') => field.and_then(toggle).map_or(KeyResult::Handled, KeyResult::Event),
      KeyCode::Enter => match field {
        Some(f) if matches!(f.kind, FieldKind::Flag | FieldKind::Choice(_)) => {
          toggle(f).map_or(KeyResult::Handled, KeyResult::Event)
        }
        Some(f) => {
          self.editing = Some((f.name.clone(), TextInput::with_value(&f.value)));
          KeyResult::Handled
        }
        None => KeyResult::Handled,
      },
      KeyCode::Char('+') => KeyResult::Event(FormEvent::AddChild),
      KeyCode::Char('-') => field
        .and_then(|f| child_index(&f.name))
        .map_or(KeyResult::Handled, |i| KeyResult::Event(FormEvent::RemoveChild(i))),
      // Modal: nothing leaks to the view underneath
      _ => KeyResult::Handled,
    }
  }

  pub fn render(
    &mut self,
    frame: &mut Frame,
    area: Rect,
    title: &str,
    fields: &[FieldSpec],
    submitting: bool,
    error: Option<&str>,
  ) {
    let height = fields.len() as u16 + 5;
    let overlay_area = centered_rect(area, 76, height);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", title));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height < 3 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Min(1),
        Constraint::Length(1), // error
        Constraint::Length(1), // hints
      ])
      .split(inner);

    let value_width = (inner.width as usize).saturating_sub(LABEL_WIDTH + 4);
    let items: Vec<ListItem> = fields
      .iter()
      .map(|field| {
        let marker = if field.required { "*" } else { " " };
        let label = Span::styled(
          format!("{:<width$}", truncate(&format!("{}{}", field.label, marker), LABEL_WIDTH), width = LABEL_WIDTH),
          Style::default().fg(Color::Cyan),
        );
        let value = match &self.editing {
          Some((name, input)) if *name == field.name => {
            let (before, after) = input.split_at_cursor();
            vec![
              Span::raw(before.to_string()),
              Span::styled("_", Style::default().fg(Color::Yellow)),
              Span::raw(after.to_string()),
            ]
          }
          _ => vec![value_span(field, value_width)],
        };
        let mut spans = vec![label];
        spans.extend(value);
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select((!fields.is_empty()).then_some(self.selected));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    if let Some(error) = error {
      frame.render_widget(
        Paragraph::new(Span::styled(format!(" {}", error), Style::default().fg(Color::Red))),
        chunks[1],
      );
    }

    let hints = if submitting {
      Line::from(Span::styled(" Saving...", Style::default().fg(Color::DarkGray)))
    } else {
      let has_children = fields.iter().any(|f| child_index(&f.name).is_some());
      let mut spans = hint(&["ctrl-s", "save", "enter", "edit", "space", "toggle"]);
      if has_children {
        spans.extend(hint(&["+/-", "row"]));
      }
      spans.extend(hint(&["esc", "cancel"]));
      Line::from(spans)
    };
    frame.render_widget(Paragraph::new(hints), chunks[2]);

    if let Some(picker) = &self.picking {
      if let Some(field) = fields.iter().find(|f| f.name == picker.name) {
        render_picker(frame, overlay_area, field, picker.cursor);
      }
    }
  }
}

fn render_picker(frame: &mut Frame, area: Rect, field: &FieldSpec, cursor: usize) {
  let height = (field.options.len() as u16 + 2).min(14);
  let picker_area = centered_rect(area, 52, height);
  frame.render_widget(Clear, picker_area);

  let multi = matches!(field.kind, FieldKind::PickMany(_));
  let chosen = IdSet::parse(&field.name, &field.value).unwrap_or_default();
  let items: Vec<ListItem> = field
    .options
    .iter()
    .map(|option| {
      let marker = match (multi, chosen.contains(&option.id)) {
        (true, true) => "[x] ",
        (true, false) => "[ ] ",
        (false, true) => "(*) ",
        (false, false) => "( ) ",
      };
      ListItem::new(format!("{}{}", marker, option.label))
    })
    .collect();

  let list = List::new(items)
    .block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" {} ", field.label)),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
  let mut state = ListState::default();
  state.select(Some(cursor));
  frame.render_stateful_widget(list, picker_area, &mut state);
}

impl ShortcutProvider for FormOverlay {
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.picking.is_some() {
      return vec![
        ShortcutInfo::new("space", "toggle").with_priority(1),
        ShortcutInfo::new("enter", "done").with_priority(2),
        ShortcutInfo::new("esc", "close").with_priority(3),
      ];
    }
    if self.is_editing() {
      return vec![
        ShortcutInfo::new("enter", "apply").with_priority(1),
        ShortcutInfo::new("esc", "discard").with_priority(2),
      ];
    }
    vec![
      ShortcutInfo::new("ctrl-s", "save").with_priority(1),
      ShortcutInfo::new("esc", "cancel").with_priority(2),
    ]
  }
}

/// Next value for a flag or choice field
fn toggle(field: &FieldSpec) -> Option<FormEvent> {
  let value = match field.kind {
    FieldKind::Flag => FieldValue::Flag(field.value != "yes"),
    FieldKind::Choice(options) => {
      let current = options.iter().position(|o| *o == field.value);
      let next = current.map_or(0, |i| (i + 1) % options.len());
      FieldValue::text(*options.get(next)?)
    }
    _ => return None,
  };
  Some(FormEvent::Set(field.name.clone(), value))
}

/// Row index of a nested field name like `stages.2.name`
fn child_index(name: &str) -> Option<usize> {
  let mut parts = name.split('.');
  parts.next()?;
  let index = parts.next()?.parse().ok()?;
  parts.next().map(|_| index)
}

fn value_span(field: &FieldSpec, width: usize) -> Span<'static> {
  let style = match field.kind {
    FieldKind::Flag if field.value == "yes" => Style::default().fg(Color::Green),
    FieldKind::Flag => Style::default().fg(Color::DarkGray),
    FieldKind::Choice(_) | FieldKind::Pick(_) | FieldKind::PickMany(_) => {
      Style::default().fg(Color::Magenta)
    }
    _ => Style::default().fg(Color::White),
  };
  let shown = if field.kind == FieldKind::Multiline {
    field.value.replace('\n', " ⏎ ")
  } else {
    field.display_value()
  };
  Span::styled(truncate(&shown, width), style)
}

fn hint(pairs: &[&'static str]) -> Vec<Span<'static>> {
  pairs
    .chunks(2)
    .flat_map(|pair| {
      vec![
        Span::styled(format!(" <{}>", pair[0]), Style::default().fg(Color::Cyan)),
        Span::styled(format!(" {}", pair.get(1).unwrap_or(&"")), Style::default().fg(Color::DarkGray)),
      ]
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lookup::{Lookup, LookupOption};

  const KINDS: &[&str] = &["all", "selected"];

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn fields() -> Vec<FieldSpec> {
    vec![
      FieldSpec::new("name", "Name", FieldKind::Text).value("Visa").required(),
      FieldSpec::new("access_type", "Access", FieldKind::Choice(KINDS)).value("all"),
      FieldSpec::new("stages.0.name", "Stage 1", FieldKind::Text).value("Lodged"),
      FieldSpec::new("stages.0.is_win_stage", "Win stage", FieldKind::Flag).flag(false),
    ]
  }

  #[test]
  fn test_edit_text_field() {
    let mut overlay = FormOverlay::new();
    let fields = fields();
    overlay.handle_key(key(KeyCode::Enter), &fields, false);
    assert!(overlay.is_editing());
    overlay.handle_key(key(KeyCode::Char('!')), &fields, false);
    assert_eq!(
      overlay.handle_key(key(KeyCode::Enter), &fields, false),
      KeyResult::Event(FormEvent::Set("name".into(), FieldValue::text("Visa!")))
    );
    assert!(!overlay.is_editing());
  }

  #[test]
  fn test_space_cycles_choice_and_toggles_flag() {
    let mut overlay = FormOverlay::new();
    let fields = fields();
    overlay.handle_key(key(KeyCode::Down), &fields, false);
    assert_eq!(
      overlay.handle_key(key(KeyCode::Char(' ')), &fields, false),
      KeyResult::Event(FormEvent::Set("access_type".into(), FieldValue::text("selected")))
    );
    overlay.handle_key(key(KeyCode::Down), &fields, false);
    overlay.handle_key(key(KeyCode::Down), &fields, false);
    assert_eq!(
      overlay.handle_key(key(KeyCode::Char(' ')), &fields, false),
      KeyResult::Event(FormEvent::Set("stages.0.is_win_stage".into(), FieldValue::Flag(true)))
    );
  }

  #[test]
  fn test_child_rows() {
    let mut overlay = FormOverlay::new();
    let fields = fields();
    // Not inside a row
    assert_eq!(overlay.handle_key(key(KeyCode::Char('-')), &fields, false), KeyResult::Handled);
    overlay.handle_key(key(KeyCode::Down), &fields, false);
    overlay.handle_key(key(KeyCode::Down), &fields, false);
    assert_eq!(
      overlay.handle_key(key(KeyCode::Char('-')), &fields, false),
      KeyResult::Event(FormEvent::RemoveChild(0))
    );
    assert_eq!(
      overlay.handle_key(key(KeyCode::Char('+')), &fields, false),
      KeyResult::Event(FormEvent::AddChild)
    );
  }

  #[test]
  fn test_submit_disabled_while_submitting() {
    let mut overlay = FormOverlay::new();
    let fields = fields();
    let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
    assert_eq!(overlay.handle_key(ctrl_s, &fields, true), KeyResult::Handled);
    assert_eq!(overlay.handle_key(ctrl_s, &fields, false), KeyResult::Event(FormEvent::Submit));
  }

  fn pickers() -> Vec<FieldSpec> {
    let users = vec![
      LookupOption { id: "5".into(), label: "Priya Shah".into() },
      LookupOption { id: "8".into(), label: "Front desk".into() },
    ];
    let types = vec![
      LookupOption { id: "2".into(), label: "Passport".into() },
      LookupOption { id: "3".into(), label: "Transcript".into() },
    ];
    let mut shared = FieldSpec::new("shared_users", "Shared users", FieldKind::PickMany(Lookup::Users)).value("5");
    shared.options = users;
    let mut doc = FieldSpec::new("document_type_id", "Document type", FieldKind::Pick(Lookup::DocumentTypes)).value("2");
    doc.options = types;
    vec![shared, doc]
  }

  #[test]
  fn test_multi_picker_toggles_by_name() {
    let mut overlay = FormOverlay::new();
    let fields = pickers();
    overlay.handle_key(key(KeyCode::Enter), &fields, false);
    assert!(overlay.is_editing());

    overlay.handle_key(key(KeyCode::Down), &fields, false);
    let mut expected = IdSet::new();
    expected.add("shared_users", "5").unwrap();
    expected.add("shared_users", "8").unwrap();
    assert_eq!(
      overlay.handle_key(key(KeyCode::Char(' ')), &fields, false),
      KeyResult::Event(FormEvent::Set("shared_users".into(), FieldValue::Ids(expected)))
    );
    // Enter closes a multi picker without another toggle
    assert_eq!(overlay.handle_key(key(KeyCode::Enter), &fields, false), KeyResult::Handled);
    assert!(!overlay.is_editing());
  }

  #[test]
  fn test_single_picker_starts_on_current_and_sets_id() {
    let mut overlay = FormOverlay::new();
    let fields = pickers();
    overlay.handle_key(key(KeyCode::Down), &fields, false);
    overlay.handle_key(key(KeyCode::Char(' ')), &fields, false);
    overlay.handle_key(key(KeyCode::Down), &fields, false);
    assert_eq!(
      overlay.handle_key(key(KeyCode::Enter), &fields, false),
      KeyResult::Event(FormEvent::Set("document_type_id".into(), FieldValue::text("3")))
    );
    assert!(!overlay.is_editing());
  }

  #[test]
  fn test_picker_without_options_edits_ids_as_text() {
    let mut overlay = FormOverlay::new();
    let mut fields = pickers();
    fields[0].options.clear();
    overlay.handle_key(key(KeyCode::Enter), &fields, false);
    overlay.handle_key(key(KeyCode::Char(',')), &fields, false);
    overlay.handle_key(key(KeyCode::Char('9')), &fields, false);
    assert_eq!(
      overlay.handle_key(key(KeyCode::Enter), &fields, false),
      KeyResult::Event(FormEvent::Set("shared_users".into(), FieldValue::text("5,9")))
    );
  }

  #[test]
  fn test_child_index() {
    assert_eq!(child_index("stages.3.name"), Some(3));
    assert_eq!(child_index("stages.x.name"), None);
    assert_eq!(child_index("name"), None);
    assert_eq!(child_index("stages.3"), None);
  }
}
