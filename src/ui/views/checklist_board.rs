use super::resource_list::error_hint;
use crate::api::RecordId;
use crate::checklist::ChecklistBoard;
use crate::cache::QueryCache;
use crate::panel::ResourcePanel;
use crate::query::{Query, QueryState};
use crate::resources::{ChecklistItem, ChecklistWorkflow, Resource, WorkflowChecklist};
use crate::ui::components::{KeyResult, PanelControls, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{draw_notification, header_line, row_line};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// One line of the board: a stage header or an item under it
#[derive(Debug, Clone)]
enum BoardRow {
  Stage { id: RecordId, name: String, count: usize },
  Item(ChecklistItem),
}

/// Items of one workflow's checklist, grouped by stage
pub struct ChecklistBoardView {
  board: ChecklistBoard,
  controls: PanelControls<ChecklistItem>,
  detail: Query<Option<WorkflowChecklist>>,
  name: String,
  list_state: ListState,
  search: SearchInput,
}

impl ChecklistBoardView {
  pub fn new(cache: QueryCache, workflow: ChecklistWorkflow) -> Self {
    let board = ChecklistBoard::new(cache.clone(), workflow.id);
    let mut detail = Query::new(cache, board.detail_key().clone(), |snap| snap.object::<WorkflowChecklist>());
    detail.fetch();

    Self {
      board,
      controls: PanelControls::new(),
      detail,
      name: workflow.name,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  fn checklist(&self) -> Option<&WorkflowChecklist> {
    self.detail.data().and_then(Option::as_ref)
  }

  /// Stages in order with their matching items. A stage stays visible while
  /// not searching even when it has no items, so 'n' can target it.
  fn rows(&self) -> Vec<BoardRow> {
    let Some(checklist) = self.checklist() else {
      return Vec::new();
    };
    let search = self.search.query();
    let mut rows = Vec::new();
    for stage in &checklist.stages {
      let items = ResourcePanel::<ChecklistItem>::rows(&stage.checklists, search);
      if items.is_empty() && !search.is_empty() {
        continue;
      }
      rows.push(BoardRow::Stage {
        id: stage.id.clone(),
        name: stage.name.clone(),
        count: stage.checklists.len(),
      });
      rows.extend(items.into_iter().cloned().map(BoardRow::Item));
    }
    rows
  }

  fn selected(&self) -> Option<BoardRow> {
    let idx = self.list_state.selected()?;
    self.rows().into_iter().nth(idx)
  }

  fn selected_item(&self) -> Option<ChecklistItem> {
    match self.selected()? {
      BoardRow::Item(item) => Some(item),
      BoardRow::Stage { .. } => None,
    }
  }

  /// Stage a new item goes to: the selected header, or the selected item's stage
  fn selected_stage(&self) -> Option<RecordId> {
    match self.selected()? {
      BoardRow::Stage { id, .. } => Some(id),
      BoardRow::Item(item) => self
        .checklist()?
        .stage_of(&item.id)
        .map(|stage| stage.id.clone()),
    }
  }

  fn title(&self) -> String {
    let status = if self.board.panel().is_deleting() {
      " (deleting...)".to_string()
    } else {
      match self.detail.state() {
        QueryState::Loading => " (loading...)".to_string(),
        QueryState::Error(_) => " (error)".to_string(),
        _ if self.detail.is_refreshing() => " (refreshing...)".to_string(),
        _ => format!(
          " ({} items)",
          self.checklist().map_or(0, WorkflowChecklist::item_count)
        ),
      }
    };
    format!(" {}{}{} ", self.name, status, self.search.indicator())
  }

  fn render_board(&mut self, frame: &mut Frame, area: Rect) {
    let rows = self.rows();
    ensure_valid_selection(&mut self.list_state, rows.len());

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() && !self.detail.is_loading() {
      let content = match self.detail.error() {
        Some(e) if self.checklist().is_none() => error_hint(e),
        _ if !self.search.query().is_empty() => "No items match the search.".to_string(),
        _ => "This workflow has no stages.".to_string(),
      };
      frame.render_widget(
        Paragraph::new(content)
          .block(block)
          .style(Style::default().fg(Color::DarkGray))
          .wrap(Wrap { trim: true }),
        area,
      );
      return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);
    frame.render_widget(Paragraph::new(header_line(ChecklistItem::columns())), chunks[0]);

    let items: Vec<ListItem> = rows
      .iter()
      .map(|row| match row {
        BoardRow::Stage { name, count, .. } => ListItem::new(Line::from(vec![
          Span::styled(format!("▸ {}", name), Style::default().fg(Color::Yellow).bold()),
          Span::styled(format!("  {} items", count), Style::default().fg(Color::DarkGray)),
        ])),
        BoardRow::Item(item) => {
          let mut line = row_line(&item.cells(), ChecklistItem::columns());
          line.spans.insert(0, Span::raw("  "));
          ListItem::new(line)
        }
      })
      .collect();

    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[1], &mut self.list_state);
  }
}

impl View for ChecklistBoardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.controls.handle_key(self.board.panel_mut(), key) != KeyResult::NotHandled {
      return ViewAction::None;
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(_)) => {
        self.list_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.list_state.select_last(),
      KeyCode::Char('n') => {
        let stage = self.selected_stage();
        self.board.panel_mut().dismiss();
        self.board.open_create(stage.as_ref());
        self.controls.form_opened();
      }
      KeyCode::Char('e') | KeyCode::Enter => {
        if let Some(item) = self.selected_item() {
          self.board.panel_mut().dismiss();
          self.controls.open_edit(self.board.panel_mut(), &item);
        }
      }
      KeyCode::Char('d') => {
        if let Some(item) = self.selected_item() {
          self.controls.request_delete(self.board.panel_mut(), &item);
        }
      }
      KeyCode::Char('r') => {
        self.board.panel().refresh();
        self.detail.refetch();
      }
      KeyCode::Esc if self.board.panel().notification().is_some() => self.board.panel_mut().dismiss(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let area = draw_notification(frame, area, self.board.panel().notification());
    self.render_board(frame, area);
    self.search.render_overlay(frame, area);
    self.controls.render(frame, area, self.board.panel());
  }

  fn breadcrumb_label(&self) -> String {
    self.name.clone()
  }

  fn tick(&mut self) {
    self.controls.tick(self.board.panel_mut());
    self.detail.poll();
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.controls.is_modal(self.board.panel())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let modal = self.controls.shortcuts(self.board.panel());
    if !modal.is_empty() {
      return modal;
    }
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n", "new item").with_priority(40),
      ShortcutInfo::new("e", "edit").with_priority(41),
      ShortcutInfo::new("d", "delete").with_priority(42),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Credential, HttpMethod, MemoryBackend, ResourceClient, Session};
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn setup() -> (Arc<MemoryBackend>, ChecklistBoardView) {
    let backend = Arc::new(MemoryBackend::new());
    backend.fixture(
      "/document-checklists/3",
      json!({"id": 3, "name": "Student visa", "stages": [
        {"id": 30, "name": "Applied", "order": 1, "checklists": [
          {"id": 7, "document_type_id": 2, "document_type_name": "Passport", "description": "Passport scan"}
        ]},
        {"id": 31, "name": "Enrolled", "order": 2, "checklists": []}
      ]}),
    );
    let client = ResourceClient::new(backend.clone(), Session::new(Credential::new("t0k"), None));
    let workflow = ChecklistWorkflow {
      id: RecordId::from(3u64),
      name: "Student visa".to_string(),
      stages_count: "2".to_string(),
    };
    (backend, ChecklistBoardView::new(QueryCache::new(client), workflow))
  }

  fn press(view: &mut ChecklistBoardView, code: KeyCode) -> ViewAction {
    view.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
  }

  async fn settle(view: &mut ChecklistBoardView) {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
  }

  #[tokio::test]
  async fn test_rows_group_items_under_stages() {
    let (_backend, mut view) = setup();
    settle(&mut view).await;

    let rows = view.rows();
    assert_eq!(rows.len(), 3);
    assert!(matches!(&rows[0], BoardRow::Stage { name, count: 1, .. } if name == "Applied"));
    assert!(matches!(&rows[1], BoardRow::Item(item) if item.description == "Passport scan"));
    assert!(matches!(&rows[2], BoardRow::Stage { name, .. } if name == "Enrolled"));

    press(&mut view, KeyCode::Char('/'));
    for c in "visa".chars() {
      press(&mut view, KeyCode::Char(c));
    }
    assert!(view.rows().is_empty());
  }

  #[tokio::test]
  async fn test_new_item_targets_selected_stage() {
    let (backend, mut view) = setup();
    settle(&mut view).await;
    view.list_state.select(Some(2));

    press(&mut view, KeyCode::Char('n'));
    assert!(view.captures_input());
    let form = view.board.panel().form();
    assert_eq!(form.draft().workflow_stage_id, "31");
    assert_eq!(backend.total_calls(), 1);

    press(&mut view, KeyCode::Esc);
    view.list_state.select(Some(1));
    press(&mut view, KeyCode::Char('n'));
    assert_eq!(view.board.panel().form().draft().workflow_stage_id, "30");
  }

  #[tokio::test]
  async fn test_delete_item_refetches_board() {
    let (backend, mut view) = setup();
    backend.seed(
      "document-checklists",
      vec![json!({"id": 7, "description": "Passport scan"})],
    );
    settle(&mut view).await;
    view.list_state.select(Some(1));

    press(&mut view, KeyCode::Char('d'));
    press(&mut view, KeyCode::Char('y'));
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(backend.calls(HttpMethod::Post, "/document-checklists/7"), 1);
    assert_eq!(backend.calls(HttpMethod::Get, "/document-checklists/3"), 2);
    assert!(backend.records("document-checklists").is_empty());
  }

  #[tokio::test]
  async fn test_document_type_shown_by_name() {
    let (backend, mut view) = setup();
    backend.seed(
      "document-types",
      vec![json!({"id": 2, "name": "Passport"}), json!({"id": 4, "name": "Offer letter"})],
    );
    settle(&mut view).await;
    view.list_state.select(Some(1));

    press(&mut view, KeyCode::Char('e'));
    settle(&mut view).await;

    let fields = view.controls.fields(view.board.panel());
    let doc = fields.iter().find(|f| f.name == "document_type_id").unwrap();
    assert_eq!(doc.options.len(), 2);
    assert_eq!(doc.display_value(), "Passport");
    assert_eq!(backend.calls(HttpMethod::Get, "/document-types"), 1);
  }
}
