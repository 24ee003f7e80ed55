use super::resource_list::error_hint;
use super::ChecklistBoardView;
use crate::cache::QueryCache;
use crate::checklist::{self, MARK_CHECKLISTED_PATH};
use crate::panel::Notification;
use crate::query::{MutationTask, Query, QueryState};
use crate::resources::ChecklistWorkflow;
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{draw_notification, pad};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
  /// Workflows that already have a checklist
  Checklisted,
  /// Workflows without one yet
  Available,
}

/// Workflows split by whether they carry a document checklist
pub struct ChecklistWorkflowsView {
  cache: QueryCache,
  checklisted: Query<Vec<ChecklistWorkflow>>,
  available: Query<Vec<ChecklistWorkflow>>,
  tab: Tab,
  list_state: ListState,
  search: SearchInput,
  confirm: ConfirmDialog,
  /// Workflow waiting for the user's answer, then for the server
  marking: Option<ChecklistWorkflow>,
  mark: Option<MutationTask>,
  notification: Option<Notification>,
}

impl ChecklistWorkflowsView {
  pub fn new(cache: QueryCache) -> Self {
    let (checklisted_key, available_key) = checklist::workflow_keys(&cache);
    let mut checklisted = Query::new(cache.clone(), checklisted_key, |snap| snap.decode_as::<ChecklistWorkflow>());
    let mut available = Query::new(cache.clone(), available_key, |snap| snap.decode_as::<ChecklistWorkflow>());
    checklisted.fetch();
    available.fetch();

    Self {
      cache,
      checklisted,
      available,
      tab: Tab::Checklisted,
      list_state: ListState::default(),
      search: SearchInput::new(),
      confirm: ConfirmDialog::new(),
      marking: None,
      mark: None,
      notification: None,
    }
  }

  fn query(&self) -> &Query<Vec<ChecklistWorkflow>> {
    match self.tab {
      Tab::Checklisted => &self.checklisted,
      Tab::Available => &self.available,
    }
  }

  fn rows(&self) -> Vec<&ChecklistWorkflow> {
    let needle = self.search.query().to_lowercase();
    self
      .query()
      .data()
      .map(|v| v.as_slice())
      .unwrap_or(&[])
      .iter()
      .filter(|w| w.name.to_lowercase().contains(&needle))
      .collect()
  }

  fn selected(&self) -> Option<ChecklistWorkflow> {
    let idx = self.list_state.selected()?;
    self.rows().get(idx).map(|w| (*w).clone())
  }

  fn switch_tab(&mut self) {
    self.tab = match self.tab {
      Tab::Checklisted => Tab::Available,
      Tab::Available => Tab::Checklisted,
    };
    self.list_state.select(Some(0));
  }

  fn ask_mark(&mut self) {
    if self.mark.is_some() {
      return;
    }
    if let Some(workflow) = self.selected() {
      self
        .confirm
        .show(format!("Create a document checklist for '{}'?", workflow.name));
      self.marking = Some(workflow);
    }
  }

  fn start_mark(&mut self) {
    let Some(workflow) = &self.marking else {
      return;
    };
    debug!(path = MARK_CHECKLISTED_PATH, workflow = %workflow.id, "marking workflow");
    self.mark = Some(MutationTask::spawn(
      self.cache.client().clone(),
      checklist::mark_checklisted(&workflow.id),
    ));
  }

  fn render_tabs(&self, frame: &mut Frame, area: Rect) {
    let count = |q: &Query<Vec<ChecklistWorkflow>>| q.data().map_or(0, Vec::len);
    let titles = vec![
      format!(" With checklist ({}) ", count(&self.checklisted)),
      format!(" Available ({}) ", count(&self.available)),
    ];
    let selected = match self.tab {
      Tab::Checklisted => 0,
      Tab::Available => 1,
    };
    let tabs = Tabs::new(titles)
      .select(selected)
      .style(Style::default().fg(Color::DarkGray))
      .highlight_style(Style::default().fg(Color::Yellow).bold());
    frame.render_widget(tabs, area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows().len();
    ensure_valid_selection(&mut self.list_state, len);

    let status = if self.mark.is_some() {
      " (creating checklist...)".to_string()
    } else if self.query().is_loading() {
      " (loading...)".to_string()
    } else {
      String::new()
    };
    let block = Block::default()
      .title(format!(" Workflows{}{} ", status, self.search.indicator()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query().is_loading() {
      let content = match self.query().state() {
        QueryState::Error(e) => error_hint(e),
        _ if self.tab == Tab::Available => "Every workflow already has a checklist.".to_string(),
        _ => "No checklists yet. Switch to 'Available' with <tab> and press 'm'.".to_string(),
      };
      frame.render_widget(
        Paragraph::new(content).block(block).style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    }

    let items: Vec<ListItem> = self
      .rows()
      .iter()
      .map(|w| {
        ListItem::new(Line::from(vec![
          Span::styled(pad(&w.name, 40), Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::styled(
            if w.stages_count.is_empty() {
              String::new()
            } else {
              format!("{} stages", w.stages_count)
            },
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for ChecklistWorkflowsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.start_mark();
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.marking = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
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
      KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') | KeyCode::Left | KeyCode::Right => {
        self.switch_tab()
      }
      KeyCode::Char('m') if self.tab == Tab::Available => self.ask_mark(),
      KeyCode::Enter => match self.tab {
        Tab::Checklisted => {
          if let Some(workflow) = self.selected() {
            return ViewAction::Push(Box::new(ChecklistBoardView::new(
              self.cache.clone(),
              workflow,
            )));
          }
        }
        Tab::Available => self.ask_mark(),
      },
      KeyCode::Char('r') => {
        self.checklisted.refetch();
        self.available.refetch();
      }
      KeyCode::Esc if self.notification.is_some() => self.notification = None,
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let area = draw_notification(frame, area, self.notification.as_ref());
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(area);

    self.render_tabs(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    self.search.render_overlay(frame, chunks[1]);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Document Checklists".to_string()
  }

  fn tick(&mut self) {
    self.checklisted.poll();
    self.available.poll();

    if let Some(result) = self.mark.as_mut().and_then(MutationTask::poll) {
      self.mark = None;
      let name = self.marking.take().map(|w| w.name).unwrap_or_default();
      checklist::finish_mark(&self.cache, &result);
      self.notification = Some(match result {
        Ok(outcome) => Notification::success(
          outcome
            .message
            .unwrap_or_else(|| format!("Checklist created for {}", name)),
        ),
        Err(e) => Notification::error(e.to_string()),
      });
    }
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("tab", "switch").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    match self.tab {
      Tab::Checklisted => shortcuts.push(ShortcutInfo::new("enter", "open").with_priority(40)),
      Tab::Available => shortcuts.push(ShortcutInfo::new("m", "create checklist").with_priority(40)),
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Credential, Envelope, HttpMethod, MemoryBackend, ResourceClient, Session};
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn press(view: &mut ChecklistWorkflowsView, code: KeyCode) -> ViewAction {
    view.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
  }

  async fn settle(view: &mut ChecklistWorkflowsView) {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
  }

  #[tokio::test]
  async fn test_mark_available_workflow() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fixture(
      "/document-checklists?checklist_available=0",
      json!([{"id": 1, "name": "Student visa", "stages_count": 4}]),
    );
    backend.fixture(
      "/document-checklists?checklist_available=1",
      json!([{"id": 2, "name": "Admission"}]),
    );
    backend.action(MARK_CHECKLISTED_PATH, Envelope::success(serde_json::Value::Null));
    let client = ResourceClient::new(backend.clone(), Session::new(Credential::new("t0k"), None));
    let mut view = ChecklistWorkflowsView::new(QueryCache::new(client));
    settle(&mut view).await;
    assert_eq!(view.rows().len(), 1);

    press(&mut view, KeyCode::Tab);
    press(&mut view, KeyCode::Char('m'));
    assert!(view.captures_input());
    press(&mut view, KeyCode::Char('y'));
    settle(&mut view).await;

    let notification = view.notification.clone().unwrap();
    assert_eq!(notification.message, "Checklist created for Admission");
    assert_eq!(backend.last_form().unwrap().get("workflow_id"), Some("2"));
    settle(&mut view).await;
    assert_eq!(
      backend.calls(HttpMethod::Get, "/document-checklists?checklist_available=1"),
      2
    );
  }

  #[tokio::test]
  async fn test_enter_opens_board() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fixture(
      "/document-checklists?checklist_available=0",
      json!([{"id": 1, "name": "Student visa"}]),
    );
    let client = ResourceClient::new(backend, Session::new(Credential::new("t0k"), None));
    let mut view = ChecklistWorkflowsView::new(QueryCache::new(client));
    settle(&mut view).await;
    view.list_state.select(Some(0));

    match press(&mut view, KeyCode::Enter) {
      ViewAction::Push(board) => assert_eq!(board.breadcrumb_label(), "Student visa"),
      _ => panic!("expected the checklist board"),
    }
  }
}
