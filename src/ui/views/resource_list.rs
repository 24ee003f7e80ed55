use crate::api::RecordId;
use crate::cache::{QueryCache, QueryKey};
use crate::error::ClientError;
use crate::panel::{Notification, PanelState, ResourcePanel};
use crate::query::{Query, QueryState};
use crate::resources::Resource;
use crate::ui::components::{KeyResult, PanelControls, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{draw_notification, header_line, row_line};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// List + detail + form for any resource collection
pub struct ResourceListView<R: Resource> {
  panel: ResourcePanel<R>,
  controls: PanelControls<R>,
  query: Query<Vec<R>>,
  /// Open while the panel is viewing a record
  detail: Option<Query<Option<R>>>,
  /// Full record being read for `e`; list rows may omit fields the form sends
  pending_edit: Option<Query<Option<R>>>,
  list_state: ListState,
  search: SearchInput,
}

impl<R: Resource> ResourceListView<R> {
  pub fn new(cache: QueryCache) -> Self {
    let panel = ResourcePanel::<R>::new(cache.clone());
    let mut query = Query::new(cache, panel.list_key().clone(), |snap| snap.decode::<R>());
    query.fetch();

    Self {
      panel,
      controls: PanelControls::new(),
      query,
      detail: None,
      pending_edit: None,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  fn records(&self) -> &[R] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn rows(&self) -> Vec<&R> {
    ResourcePanel::rows(self.records(), self.search.query())
  }

  fn selected(&self) -> Option<R> {
    let idx = self.list_state.selected()?;
    self.rows().get(idx).map(|r| (*r).clone())
  }

  /// The record shown in the detail pane: fresh from its own endpoint when
  /// loaded, else the list's copy.
  fn viewing(&self) -> Option<R> {
    let PanelState::Viewing(id) = self.panel.state() else {
      return None;
    };
    self
      .detail
      .as_ref()
      .and_then(|q| q.data().cloned().flatten())
      .or_else(|| self.records().iter().find(|r| r.id() == &id).cloned())
  }

  fn open_detail(&mut self, id: RecordId) {
    let cache = self.panel.cache().clone();
    let key = QueryKey::detail::<R>(&id, cache.client().session());
    let mut query = Query::new(cache, key, |snap| snap.object::<R>());
    query.fetch();
    self.detail = Some(query);
    self.panel.view(id);
  }

  fn close_detail(&mut self) {
    self.detail = None;
    self.panel.close_view();
  }

  /// Record the next action applies to: the open detail, else the selected row
  fn target(&self) -> Option<R> {
    self.viewing().or_else(|| self.selected())
  }

  /// Open the edit form from the record's own endpoint. A loaded detail pane
  /// is used as is, otherwise the form opens when the fetch lands.
  fn begin_edit(&mut self) {
    let Some(target) = self.target() else {
      return;
    };
    self.panel.dismiss();

    let loaded = self
      .detail
      .as_ref()
      .filter(|q| !q.is_refreshing())
      .and_then(|q| q.data().cloned().flatten())
      .filter(|r| r.id() == target.id());
    if let Some(record) = loaded {
      self.pending_edit = None;
      self.controls.open_edit(&mut self.panel, &record);
      return;
    }

    let cache = self.panel.cache().clone();
    let key = QueryKey::detail::<R>(target.id(), cache.client().session());
    let mut query = Query::new(cache, key, |snap| snap.object::<R>());
    query.fetch();
    self.pending_edit = Some(query);
  }

  fn poll_pending_edit(&mut self) {
    let Some(pending) = &mut self.pending_edit else {
      return;
    };
    pending.poll();
    let landed = match pending.state() {
      QueryState::Success(Some(record)) => Ok(record.clone()),
      QueryState::Success(None) => Err(format!("Could not read the {} for editing", R::NOUN)),
      QueryState::Error(e) => Err(e.to_string()),
      QueryState::Idle | QueryState::Loading => return,
    };
    self.pending_edit = None;
    match landed {
      Ok(record) => self.controls.open_edit(&mut self.panel, &record),
      Err(message) => self.panel.notify(Notification::error(message)),
    }
  }

  fn title(&self) -> String {
    let status = if self.panel.is_deleting() {
      " (deleting...)".to_string()
    } else if self.pending_edit.is_some() {
      " (loading record...)".to_string()
    } else {
      match self.query.state() {
        QueryState::Loading => " (loading...)".to_string(),
        QueryState::Error(_) => " (error)".to_string(),
        _ if self.query.is_refreshing() => " (refreshing...)".to_string(),
        _ => format!(" ({})", self.rows().len()),
      }
    };
    format!(" {}{}{} ", R::LABEL, status, self.search.indicator())
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = match self.query.error() {
        Some(e) if self.records().is_empty() => error_hint(e),
        _ if !self.search.query().is_empty() => format!("No {} match the search.", R::LABEL.to_lowercase()),
        _ => format!("No {} yet. Press 'n' to create one.", R::LABEL.to_lowercase()),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, area);
      return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    frame.render_widget(Paragraph::new(header_line(R::columns())).style(Style::default()), chunks[0]);

    let items: Vec<ListItem> = self
      .rows()
      .iter()
      .map(|record| ListItem::new(row_line(&record.cells(), R::columns())))
      .collect();

    let list = List::new(items)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[1], &mut self.list_state);
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));

    let Some(record) = self.viewing() else {
      let content = match self.detail.as_ref().map(|q| q.state()) {
        Some(QueryState::Error(e)) => error_hint(e),
        _ => "Loading...".to_string(),
      };
      frame.render_widget(
        Paragraph::new(content).block(block.title(" Detail ")).style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    };

    let mut lines = Vec::new();
    for (label, value) in record.details() {
      lines.push(Line::from(vec![Span::styled(
        format!("{}:", label),
        Style::default().fg(Color::DarkGray),
      )]));
      for text in value.lines() {
        lines.push(Line::from(Span::raw(format!("  {}", text))));
      }
      if value.is_empty() {
        lines.push(Line::from(Span::styled("  -", Style::default().fg(Color::DarkGray))));
      }
    }

    let paragraph = Paragraph::new(lines)
      .block(block.title(format!(" {} #{} ", record.title(), record.id())))
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }
}

/// Empty-state text for a failed load
pub(crate) fn error_hint(error: &ClientError) -> String {
  if error.is_auth() {
    format!("{}. Set CRMDECK_TOKEN (or sign in) and restart.", error)
  } else {
    format!("Failed to load: {}. Press 'r' to retry.", error)
  }
}

impl<R: Resource> View for ResourceListView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.controls.handle_key(&mut self.panel, key) != KeyResult::NotHandled {
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
        self.pending_edit = None;
        self.panel.dismiss();
        self.controls.open_create(&mut self.panel);
      }
      KeyCode::Char('e') => self.begin_edit(),
      KeyCode::Char('d') => {
        if let Some(record) = self.target() {
          self.controls.request_delete(&mut self.panel, &record);
        }
      }
      KeyCode::Enter => {
        if let Some(record) = self.selected() {
          self.open_detail(record.id().clone());
        }
      }
      KeyCode::Char('r') => {
        self.panel.refresh();
        self.query.refetch();
        if let Some(detail) = &mut self.detail {
          detail.refetch();
        }
      }
      KeyCode::Esc => {
        if self.pending_edit.is_some() {
          self.pending_edit = None;
        } else if self.detail.is_some() {
          self.close_detail();
        } else if self.panel.notification().is_some() {
          self.panel.dismiss();
        } else {
          return ViewAction::Pop;
        }
      }
      KeyCode::Char('q') => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let area = draw_notification(frame, area, self.panel.notification());

    if self.detail.is_some() {
      let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
      self.render_list(frame, chunks[0]);
      self.render_detail(frame, chunks[1]);
    } else {
      self.render_list(frame, area);
    }

    self.search.render_overlay(frame, area);
    self.controls.render(frame, area, &self.panel);
  }

  fn breadcrumb_label(&self) -> String {
    match self.viewing() {
      Some(record) => format!("{} [{}]", R::LABEL, record.title()),
      None => R::LABEL.to_string(),
    }
  }

  fn tick(&mut self) {
    self.query.poll();
    self.controls.tick(&mut self.panel);
    self.poll_pending_edit();

    // A delete of the viewed record closes the panel's view
    if !matches!(self.panel.state(), PanelState::Viewing(_) | PanelState::Editing(_)) {
      self.detail = None;
    }
    if let Some(detail) = &mut self.detail {
      detail.poll();
    }
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.controls.is_modal(&self.panel)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let modal = self.controls.shortcuts(&self.panel);
    if !modal.is_empty() {
      return modal;
    }
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n", "new").with_priority(40),
      ShortcutInfo::new("e", "edit").with_priority(41),
      ShortcutInfo::new("d", "delete").with_priority(42),
      ShortcutInfo::new("enter", "view").with_priority(43),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Credential, HttpMethod, MemoryBackend, ResourceClient, Session};
  use crate::resources::{Tag, Workflow};
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn setup() -> (Arc<MemoryBackend>, QueryCache) {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(
      "tags",
      vec![json!({"id": 1, "name": "VIP"}), json!({"id": 2, "name": "Alumni"})],
    );
    let client = ResourceClient::new(backend.clone(), Session::new(Credential::new("t0k"), None));
    (backend, QueryCache::new(client))
  }

  fn press<R: Resource>(view: &mut ResourceListView<R>, code: KeyCode) -> ViewAction {
    view.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
  }

  async fn settle<R: Resource>(view: &mut ResourceListView<R>) {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
  }

  #[tokio::test]
  async fn test_loads_and_searches() {
    let (_backend, cache) = setup();
    let mut view = ResourceListView::<Tag>::new(cache);
    settle(&mut view).await;
    assert_eq!(view.rows().len(), 2);

    press(&mut view, KeyCode::Char('/'));
    assert!(view.captures_input());
    press(&mut view, KeyCode::Char('a'));
    press(&mut view, KeyCode::Char('l'));
    press(&mut view, KeyCode::Enter);
    assert_eq!(view.rows().len(), 1);
    assert_eq!(view.rows()[0].name, "Alumni");
  }

  #[tokio::test]
  async fn test_edit_from_detail_refreshes_both() {
    let (backend, cache) = setup();
    let mut view = ResourceListView::<Tag>::new(cache);
    settle(&mut view).await;
    view.list_state.select(Some(0));

    press(&mut view, KeyCode::Enter);
    settle(&mut view).await;
    assert_eq!(view.panel.state(), PanelState::Viewing(RecordId::from(1u64)));
    assert_eq!(view.viewing().map(|t| t.name), Some("VIP".to_string()));

    press(&mut view, KeyCode::Char('e'));
    press(&mut view, KeyCode::Enter);
    for c in "-2024".chars() {
      press(&mut view, KeyCode::Char(c));
    }
    press(&mut view, KeyCode::Enter);
    view.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(view.viewing().map(|t| t.name), Some("VIP-2024".to_string()));
    assert!(view.records().iter().any(|t| t.name == "VIP-2024"));
    assert_eq!(backend.calls(HttpMethod::Get, "/tags/1"), 2);
  }

  #[tokio::test]
  async fn test_delete_viewed_record_closes_detail() {
    let (backend, cache) = setup();
    let mut view = ResourceListView::<Tag>::new(cache);
    settle(&mut view).await;
    view.list_state.select(Some(1));
    press(&mut view, KeyCode::Enter);
    settle(&mut view).await;

    press(&mut view, KeyCode::Char('d'));
    press(&mut view, KeyCode::Char('y'));
    settle(&mut view).await;
    settle(&mut view).await;

    assert!(view.detail.is_none());
    assert_eq!(view.panel.state(), PanelState::Closed);
    assert_eq!(view.rows().len(), 1);
    assert_eq!(backend.records("tags").len(), 1);
  }

  #[tokio::test]
  async fn test_q_pops() {
    let (_backend, cache) = setup();
    let mut view = ResourceListView::<Tag>::new(cache);
    assert!(matches!(press(&mut view, KeyCode::Char('q')), ViewAction::Pop));
  }

  #[tokio::test]
  async fn test_edit_reads_full_record_before_opening() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(
      "workflows",
      vec![json!({"id": 1, "name": "Student visa", "stages": [{"id": 10, "name": "Applied"}]})],
    );
    backend.fixture(
      "/workflows/1",
      json!({
        "id": 1,
        "name": "Student visa",
        "access_type": "selected",
        "selected_offices": [3],
        "stages": [{"id": 10, "name": "Applied"}]
      }),
    );
    let client = ResourceClient::new(backend.clone(), Session::new(Credential::new("t0k"), None));
    let mut view = ResourceListView::<Workflow>::new(QueryCache::new(client));
    settle(&mut view).await;
    view.list_state.select(Some(0));

    press(&mut view, KeyCode::Char('e'));
    assert!(!view.panel.form().is_open());
    assert!(view.title().contains("loading record"));
    settle(&mut view).await;
    assert!(view.panel.form().is_open());
    assert_eq!(view.panel.form().draft().access_type, "selected");

    view.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
    settle(&mut view).await;

    let sent = backend.last_form().unwrap();
    assert_eq!(sent.get("access_type"), Some("selected"));
    assert_eq!(sent.get_all("selected_offices[]"), vec!["3"]);
    assert!(backend.calls(HttpMethod::Get, "/workflows/1") >= 1);
  }

  #[tokio::test]
  async fn test_edit_of_missing_record_notifies() {
    let (backend, cache) = setup();
    let mut view = ResourceListView::<Tag>::new(cache);
    settle(&mut view).await;
    view.list_state.select(Some(0));
    backend.fail_next(ClientError::Network("connection reset".into()));

    press(&mut view, KeyCode::Char('e'));
    settle(&mut view).await;

    assert!(!view.panel.form().is_open());
    assert!(view.pending_edit.is_none());
    assert_eq!(
      view.panel.notification().unwrap().message,
      "Network error: connection reset"
    );
  }
}
