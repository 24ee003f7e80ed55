use super::confirm::{ConfirmDialog, ConfirmEvent};
use super::form_overlay::{FormEvent, FormOverlay};
use super::KeyResult;
use crate::form::FormMode;
use crate::lookup::Lookups;
use crate::panel::{Level, Notification, ResourcePanel};
use crate::query::MutationTask;
use crate::resources::{FieldSpec, Resource};
use crate::ui::view::{ShortcutInfo, ShortcutProvider};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use std::marker::PhantomData;
use tracing::debug;

/// Form overlay, delete confirmation and the in-flight writes of one
/// [`ResourcePanel`].
///
/// Writes run in the background; `tick` applies their results to the panel.
/// Dropping the controls drops the receivers, so a result that lands after
/// the view is gone is discarded.
pub struct PanelControls<R: Resource> {
  form: FormOverlay,
  confirm: ConfirmDialog,
  submit: Option<MutationTask>,
  delete: Option<MutationTask>,
  /// Options for the form's picker fields
  lookups: Lookups,
  _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Default for PanelControls<R> {
  fn default() -> Self {
    Self {
      form: FormOverlay::new(),
      confirm: ConfirmDialog::new(),
      submit: None,
      delete: None,
      lookups: Lookups::default(),
      _resource: PhantomData,
    }
  }
}

impl<R: Resource> PanelControls<R> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn open_create(&mut self, panel: &mut ResourcePanel<R>) {
    panel.open_create();
    self.form_opened();
    self.load_lookups(panel);
  }

  pub fn open_edit(&mut self, panel: &mut ResourcePanel<R>, record: &R) {
    panel.open_edit(record);
    self.form_opened();
    self.load_lookups(panel);
  }

  fn load_lookups(&mut self, panel: &ResourcePanel<R>) {
    self.lookups.ensure(panel.cache(), &panel.form().fields());
  }

  /// The open form's fields with picker options attached.
  pub fn fields(&self, panel: &ResourcePanel<R>) -> Vec<FieldSpec> {
    let mut fields = panel.form().fields();
    self.lookups.resolve(&mut fields);
    fields
  }

  /// Reset the overlay after the panel's form was opened directly.
  pub fn form_opened(&mut self) {
    self.form.reset();
  }

  pub fn request_delete(&mut self, panel: &mut ResourcePanel<R>, record: &R) {
    if panel.is_busy() {
      return;
    }
    panel.request_delete(record);
    self
      .confirm
      .show(format!("Delete {} '{}'?", R::NOUN, record.title()));
  }

  /// A form or confirmation owns the keyboard.
  pub fn is_modal(&self, panel: &ResourcePanel<R>) -> bool {
    panel.form().is_open() || self.confirm.is_active()
  }

  pub fn captures_input(&self) -> bool {
    self.form.is_editing()
  }

  pub fn handle_key(&mut self, panel: &mut ResourcePanel<R>, key: KeyEvent) -> KeyResult<()> {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        if let Some(mutation) = panel.confirm_delete() {
          debug!(collection = R::COLLECTION, "delete confirmed");
          self.delete = Some(MutationTask::spawn(panel.cache().client().clone(), mutation));
        }
        return KeyResult::Handled;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        panel.cancel_delete();
        return KeyResult::Handled;
      }
      KeyResult::Handled => return KeyResult::Handled,
      KeyResult::NotHandled => {}
    }

    if !panel.form().is_open() {
      return KeyResult::NotHandled;
    }

    let fields = self.fields(panel);
    let event = match self.form.handle_key(key, &fields, panel.form().is_submitting()) {
      KeyResult::Event(event) => event,
      _ => return KeyResult::Handled,
    };

    let edited = match event {
      FormEvent::Set(name, value) => panel.form_mut().set_field(&name, value),
      FormEvent::AddChild => panel.form_mut().add_child(),
      FormEvent::RemoveChild(index) => panel.form_mut().remove_child(index),
      FormEvent::Submit => {
        if let Ok(mutation) = panel.begin_submit() {
          self.submit = Some(MutationTask::spawn(panel.cache().client().clone(), mutation));
        }
        return KeyResult::Handled;
      }
      FormEvent::Cancel => {
        panel.form_mut().close();
        panel.dismiss();
        return KeyResult::Handled;
      }
    };
    match edited {
      // A fixed field clears a stale validation message
      Ok(()) if panel.notification().is_some_and(|n| n.level == Level::Error) => panel.dismiss(),
      Ok(()) => {}
      Err(e) => panel.notify(Notification::error(e.message)),
    }
    KeyResult::Handled
  }

  /// Apply landed write results. Returns whether anything changed.
  pub fn tick(&mut self, panel: &mut ResourcePanel<R>) -> bool {
    let mut changed = false;
    if panel.form().is_open() {
      // Fields can appear after open, e.g. a conditional picker
      self.load_lookups(panel);
      changed |= self.lookups.poll();
    }
    if let Some(result) = self.submit.as_mut().and_then(MutationTask::poll) {
      self.submit = None;
      let _ = panel.finish_submit(result);
      changed = true;
    }
    if let Some(result) = self.delete.as_mut().and_then(MutationTask::poll) {
      self.delete = None;
      let _ = panel.finish_delete(result);
      changed = true;
    }
    changed
  }

  pub fn render(&mut self, frame: &mut Frame, area: Rect, panel: &ResourcePanel<R>) {
    if panel.form().is_open() {
      let title = match panel.form().mode() {
        FormMode::Create => format!("New {}", R::NOUN),
        FormMode::Edit(id) => format!("Edit {} #{}", R::NOUN, id),
        FormMode::Replace => format!("Edit {}", R::NOUN),
      };
      let error = panel
        .notification()
        .filter(|n| n.level == Level::Error)
        .map(|n| n.message.as_str());
      self.form.render(
        frame,
        area,
        &title,
        &self.fields(panel),
        panel.form().is_submitting(),
        error,
      );
    }
    self.confirm.render_overlay(frame, area);
  }

  pub fn shortcuts(&self, panel: &ResourcePanel<R>) -> Vec<ShortcutInfo> {
    if panel.form().is_open() {
      return self.form.shortcuts();
    }
    if self.confirm.is_active() {
      return vec![
        ShortcutInfo::new("y", "confirm").with_priority(1),
        ShortcutInfo::new("n", "cancel").with_priority(2),
      ];
    }
    Vec::new()
  }
}
