use crate::cache::{QueryCache, QueryKey};
use crate::panel::{Notification, ResourcePanel};
use crate::query::{Query, QueryState};
use crate::resources::{InvoiceAddress, RegistrationNumber, Singleton};
use crate::ui::components::{KeyResult, PanelControls};
use crate::ui::renderfns::draw_notification;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use super::resource_list::error_hint;

/// One settings record with its edit form
pub struct RecordPane<R: Singleton> {
  panel: ResourcePanel<R>,
  controls: PanelControls<R>,
  query: Query<Option<R>>,
  active: bool,
}

impl<R: Singleton> RecordPane<R> {
  pub fn new(cache: QueryCache) -> Self {
    let key = QueryKey::setting::<R>(cache.client().session());
    let panel = ResourcePanel::scoped(cache.clone(), key.clone(), Vec::new());
    let mut query = Query::new(cache, key, |snap| snap.object::<R>());
    query.fetch();

    Self {
      panel,
      controls: PanelControls::new(),
      query,
      active: true,
    }
  }

  pub fn set_active(&mut self, active: bool) {
    self.active = active;
  }

  fn record(&self) -> Option<&R> {
    self.query.data().and_then(|r| r.as_ref())
  }

  fn is_modal(&self) -> bool {
    self.controls.is_modal(&self.panel)
  }

  fn begin_edit(&mut self) {
    // Nothing to edit until the first read lands
    if !matches!(self.query.state(), QueryState::Success(_)) {
      return;
    }
    let record = self.record().cloned();
    match R::save_mode(record.as_ref()) {
      Some(mode) => {
        self.panel.dismiss();
        self.panel.form_mut().open_as(record.as_ref(), mode);
        self.controls.form_opened();
      }
      None => self
        .panel
        .notify(Notification::error(format!("No {} to update yet", R::NOUN))),
    }
  }

  fn title(&self) -> String {
    let status = match self.query.state() {
      QueryState::Loading => " (loading...)",
      QueryState::Error(_) => " (error)",
      _ if self.query.is_refreshing() => " (refreshing...)",
      _ => "",
    };
    format!(" {}{} ", R::LABEL, status)
  }

  fn render_body(&self, frame: &mut Frame, area: Rect) {
    let area = draw_notification(frame, area, self.panel.notification());
    let color = if self.active { Color::Blue } else { Color::DarkGray };
    let block = Block::default()
      .title(self.title())
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color));

    let Some(record) = self.record() else {
      let content = match self.query.state() {
        QueryState::Error(e) => error_hint(e),
        QueryState::Success(None) => format!("No {} saved yet. Press 'e' to add one.", R::NOUN),
        _ => "Loading...".to_string(),
      };
      frame.render_widget(
        Paragraph::new(content)
          .block(block)
          .style(Style::default().fg(Color::DarkGray))
          .wrap(Wrap { trim: true }),
        area,
      );
      return;
    };

    let lines: Vec<Line> = record
      .details()
      .into_iter()
      .map(|(label, value)| {
        let value = if value.is_empty() { "-".to_string() } else { value };
        Line::from(vec![
          Span::styled(format!("{:<22}", format!("{}:", label)), Style::default().fg(Color::DarkGray)),
          Span::raw(value),
        ])
      })
      .collect();
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
  }

  fn render_overlay(&mut self, frame: &mut Frame, area: Rect) {
    self.controls.render(frame, area, &self.panel);
  }
}

impl<R: Singleton> View for RecordPane<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.controls.handle_key(&mut self.panel, key) != KeyResult::NotHandled {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('e') | KeyCode::Enter => self.begin_edit(),
      KeyCode::Char('r') => {
        self.panel.refresh();
        self.query.refetch();
      }
      KeyCode::Esc if self.panel.notification().is_some() => self.panel.dismiss(),
      KeyCode::Esc | KeyCode::Char('q') => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_body(frame, area);
    self.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    R::LABEL.to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.controls.tick(&mut self.panel);
  }

  fn captures_input(&self) -> bool {
    self.is_modal()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let modal = self.controls.shortcuts(&self.panel);
    if !modal.is_empty() {
      return modal;
    }
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("e", "edit").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

/// Registration number above the invoice address; Tab moves between them.
pub struct BusinessView {
  registration: RecordPane<RegistrationNumber>,
  address: RecordPane<InvoiceAddress>,
  on_address: bool,
}

impl BusinessView {
  pub fn new(cache: QueryCache) -> Self {
    let mut address = RecordPane::new(cache.clone());
    address.set_active(false);
    Self {
      registration: RecordPane::new(cache),
      address,
      on_address: false,
    }
  }

  fn focused(&mut self) -> &mut dyn View {
    if self.on_address {
      &mut self.address
    } else {
      &mut self.registration
    }
  }

  fn focus_address(&mut self, on_address: bool) {
    self.on_address = on_address;
    self.registration.set_active(!on_address);
    self.address.set_active(on_address);
  }
}

impl View for BusinessView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if !self.captures_input() {
      match key.code {
        KeyCode::Tab | KeyCode::BackTab => {
          self.focus_address(!self.on_address);
          return ViewAction::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
          self.focus_address(true);
          return ViewAction::None;
        }
        KeyCode::Char('k') | KeyCode::Up => {
          self.focus_address(false);
          return ViewAction::None;
        }
        _ => {}
      }
    }
    self.focused().handle_key(key)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Min(0)])
      .split(area);
    self.registration.render_body(frame, chunks[0]);
    self.address.render_body(frame, chunks[1]);

    if self.on_address {
      self.address.render_overlay(frame, area);
    } else {
      self.registration.render_overlay(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Business Information".to_string()
  }

  fn tick(&mut self) {
    self.registration.tick();
    self.address.tick();
  }

  fn captures_input(&self) -> bool {
    self.registration.is_modal() || self.address.is_modal()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let focused: &dyn View = if self.on_address {
      &self.address
    } else {
      &self.registration
    };
    let mut shortcuts = focused.shortcuts();
    if !self.captures_input() {
      shortcuts.push(ShortcutInfo::new("tab", "switch").with_priority(45));
    }
    shortcuts
  }
}
