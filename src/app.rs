use crate::cache::QueryCache;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::resources::Workflow;
use crate::ui::views::{self, ResourceListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_PANEL: &str = "workflows";

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,

  /// `:` command line
  command: CommandInput,

  /// Shared query cache of the signed-in session
  cache: QueryCache,

  title: String,

  /// Shown in the footer until the next key
  status: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, cache: QueryCache) -> Self {
    let requested = config.default_panel.as_deref().unwrap_or(DEFAULT_PANEL);
    let (root, status): (Box<dyn View>, _) = match views::root_view(requested, cache.clone()) {
      Some(view) => (view, None),
      None => (
        Box::new(ResourceListView::<Workflow>::new(cache.clone())),
        Some(format!("Unknown panel '{}'", requested)),
      ),
    };

    Self {
      views: vec![root],
      command: CommandInput::new(),
      cache,
      title: config.header_title(),
      status,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(100));

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Resize) => {}
        Some(Event::Tick) => self.tick(),
        None => break,
      }
    }
    info!("quitting");
    Ok(())
  }

  fn tick(&mut self) {
    if let Some(view) = self.views.last_mut() {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }
    self.status = None;

    let captured = self.views.last().is_some_and(|v| v.captures_input());
    if self.command.is_active() || !captured {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(name)) => {
          self.execute_command(&name);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.views.last_mut() {
      Some(view) => view.handle_key(key),
      None => return,
    };
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        debug!(view = %view.breadcrumb_label(), "push");
        self.views.push(view);
      }
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, name: &str) {
    if name == "quit" {
      self.should_quit = true;
      return;
    }
    match views::root_view(name, self.cache.clone()) {
      Some(view) => {
        info!(panel = name, "switching panel");
        // Dropping the old stack discards its in-flight results
        self.views = vec![view];
      }
      None if name.is_empty() => {}
      None => self.status = Some(format!("Unknown command '{}'", name)),
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
      ])
      .split(frame.area());

    let shortcuts = self.views.last().map(|v| v.shortcuts()).unwrap_or_default();
    let user = self.cache.client().session().display_name().to_string();
    draw_header(frame, chunks[0], &self.title, &user, &shortcuts);

    if let Some(view) = self.views.last_mut() {
      view.render(frame, chunks[1]);
    }

    match &self.status {
      Some(message) => frame.render_widget(
        Paragraph::new(format!(" {}", message)).style(Style::default().fg(Color::Red).bg(Color::Black)),
        chunks[2],
      ),
      None => {
        let breadcrumb: Vec<String> = self.views.iter().map(|v| v.breadcrumb_label()).collect();
        draw_footer(frame, chunks[2], &breadcrumb);
      }
    }

    self.command.render_overlay(frame, chunks[1]);
  }
}
