//! One generic resource panel: list, detail, form and delete confirmation.

use tracing::info;

use crate::api::{Mutation, Outcome, RecordId};
use crate::cache::{QueryCache, QueryKey};
use crate::error::{ClientError, SubmitError};
use crate::form::{FormMode, FormPhase, FormState};
use crate::resources::Resource;

/// Where the panel is, derived from form and selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
  Closed,
  Viewing(RecordId),
  /// `None` while creating.
  Editing(Option<RecordId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Error,
}

/// One-shot message shown after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  pub message: String,
}

impl Notification {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      level: Level::Success,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: Level::Error,
      message: message.into(),
    }
  }
}

/// Delete waiting for the user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
  pub id: RecordId,
  pub title: String,
  /// Confirmed and sent; waiting for the result.
  pub sent: bool,
}

pub struct ResourcePanel<R: Resource> {
  cache: QueryCache,
  list_key: QueryKey,
  targets: Vec<QueryKey>,
  form: FormState<R::Draft>,
  viewing: Option<RecordId>,
  pending_delete: Option<PendingDelete>,
  notification: Option<Notification>,
}

impl<R: Resource> ResourcePanel<R> {
  /// Panel over the resource's own list endpoint.
  pub fn new(cache: QueryCache) -> Self {
    let key = QueryKey::list::<R>(cache.client().session());
    let mut panel = Self::scoped(cache, key.clone(), Vec::new());
    panel.form = FormState::new(vec![key]);
    panel
  }

  /// Panel listing from `list_key`. It and every key in `also` are
  /// invalidated after a successful write. The record's own
  /// `/{collection}/{id}` key is left alone.
  pub fn scoped(cache: QueryCache, list_key: QueryKey, also: Vec<QueryKey>) -> Self {
    let mut keys = vec![list_key.clone()];
    keys.extend(also);
    Self {
      form: FormState::new(keys.clone()).without_record_key(),
      cache,
      list_key,
      targets: keys,
      viewing: None,
      pending_delete: None,
      notification: None,
    }
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn list_key(&self) -> &QueryKey {
    &self.list_key
  }

  pub fn state(&self) -> PanelState {
    if self.form.is_open() {
      match self.form.mode() {
        FormMode::Create | FormMode::Replace => PanelState::Editing(None),
        FormMode::Edit(id) => PanelState::Editing(Some(id.clone())),
      }
    } else if let Some(id) = &self.viewing {
      PanelState::Viewing(id.clone())
    } else {
      PanelState::Closed
    }
  }

  /// Records whose title contains `search`, case-insensitively.
  pub fn rows<'a>(records: &'a [R], search: &str) -> Vec<&'a R> {
    let needle = search.trim().to_lowercase();
    records
      .iter()
      .filter(|r| needle.is_empty() || r.title().to_lowercase().contains(&needle))
      .collect()
  }

  pub fn view(&mut self, id: RecordId) {
    self.viewing = Some(id);
  }

  pub fn close_view(&mut self) {
    self.viewing = None;
  }

  pub fn open_create(&mut self) {
    self.form.open(None);
  }

  pub fn open_edit(&mut self, record: &R) {
    self.form.open(Some(record));
  }

  pub fn form(&self) -> &FormState<R::Draft> {
    &self.form
  }

  pub fn form_mut(&mut self) -> &mut FormState<R::Draft> {
    &mut self.form
  }

  /// Apply a submission result and post the matching notification.
  pub fn finish_submit(&mut self, result: Result<Outcome, ClientError>) -> Result<(), SubmitError> {
    let verb = match self.form.mode() {
      FormMode::Create => "created",
      FormMode::Edit(_) | FormMode::Replace => "updated",
    };
    match self.form.finish(result, &self.cache) {
      Ok(outcome) => {
        self.notify_success(outcome.message, verb);
        Ok(())
      }
      Err(e) => {
        self.notification = Some(Notification::error(e.to_string()));
        Err(e)
      }
    }
  }

  /// Validate the open form and build its mutation. A rejection is posted
  /// as a notification and nothing is sent.
  pub fn begin_submit(&mut self) -> Result<Mutation, SubmitError> {
    let result = self.form.begin_submit();
    if let Err(e) = &result {
      self.notification = Some(Notification::error(e.to_string()));
    }
    result
  }

  /// Submit the open form and wait for the result.
  pub async fn submit(&mut self) -> Result<(), SubmitError> {
    let mutation = self.begin_submit()?;
    let result = self.cache.client().execute(mutation).await;
    self.finish_submit(result)
  }

  /// Ask for confirmation before deleting `record`.
  pub fn request_delete(&mut self, record: &R) {
    self.pending_delete = Some(PendingDelete {
      id: record.id().clone(),
      title: record.title().to_string(),
      sent: false,
    });
  }

  pub fn pending_delete(&self) -> Option<&PendingDelete> {
    self.pending_delete.as_ref()
  }

  pub fn cancel_delete(&mut self) {
    if matches!(&self.pending_delete, Some(p) if !p.sent) {
      self.pending_delete = None;
    }
  }

  /// Confirm the pending delete, returning the mutation to send.
  /// `None` if nothing is pending or it was already sent.
  pub fn confirm_delete(&mut self) -> Option<Mutation> {
    let pending = self.pending_delete.as_mut().filter(|p| !p.sent)?;
    pending.sent = true;
    Some(Mutation::Delete {
      collection: R::COLLECTION,
      id: pending.id.clone(),
    })
  }

  pub fn is_deleting(&self) -> bool {
    matches!(&self.pending_delete, Some(p) if p.sent)
  }

  /// Apply a delete result. Success invalidates the panel's keys.
  pub fn finish_delete(&mut self, result: Result<Outcome, ClientError>) -> Result<(), ClientError> {
    let Some(pending) = self.pending_delete.take() else {
      return Ok(());
    };
    match result {
      Ok(outcome) => {
        for key in &self.targets {
          self.cache.invalidate(key);
        }
        if self.viewing.as_ref() == Some(&pending.id) {
          self.viewing = None;
        }
        info!(collection = R::COLLECTION, id = %pending.id, "deleted");
        self.notify_success(outcome.message, "deleted");
        Ok(())
      }
      Err(e) => {
        self.notification = Some(Notification::error(e.to_string()));
        Err(e)
      }
    }
  }

  /// Confirm and send the pending delete, waiting for the result.
  pub async fn delete_confirmed(&mut self) -> Result<(), ClientError> {
    let Some(mutation) = self.confirm_delete() else {
      return Ok(());
    };
    let result = self.cache.client().execute(mutation).await;
    self.finish_delete(result)
  }

  /// Refetch the list in the background.
  pub fn refresh(&self) {
    for key in &self.targets {
      self.cache.invalidate(key);
    }
  }

  pub fn notification(&self) -> Option<&Notification> {
    self.notification.as_ref()
  }

  pub fn notify(&mut self, notification: Notification) {
    self.notification = Some(notification);
  }

  pub fn dismiss(&mut self) {
    self.notification = None;
  }

  pub fn is_busy(&self) -> bool {
    self.form.phase() == FormPhase::Submitting || self.is_deleting()
  }

  fn notify_success(&mut self, message: Option<String>, verb: &str) {
    let message = message.unwrap_or_else(|| format!("{} {} successfully", capitalize(R::NOUN), verb));
    self.notification = Some(Notification::success(message));
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}
