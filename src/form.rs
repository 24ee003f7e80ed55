//! Form state for creating and editing one record.
//!
//! ```text
//! Closed -> Open(create) -> Submitting -> Closed
//! Closed -> Open(edit)   -> Submitting -> Closed
//!                           Submitting -> Open      (on failure, draft kept)
//! ```

use tracing::{debug, info};

use crate::api::{Mutation, Outcome, RecordId};
use crate::cache::{QueryCache, QueryKey};
use crate::error::{ClientError, FieldError, SubmitError};
use crate::resources::{Draft, FieldSpec, FieldValue, Resource};

/// Whether the draft becomes a new record or replaces an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
  Create,
  Edit(RecordId),
  /// Overwrite the settings record kept at the resource's own path.
  Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
  Closed,
  Open,
  Submitting,
}

pub struct FormState<D: Draft> {
  phase: FormPhase,
  mode: FormMode,
  draft: D,
  /// Invalidated after a successful submission.
  targets: Vec<QueryKey>,
  /// Also invalidate `/{collection}/{id}` after an edit.
  record_key: bool,
}

impl<D: Draft> FormState<D> {
  pub fn new(targets: Vec<QueryKey>) -> Self {
    Self {
      phase: FormPhase::Closed,
      mode: FormMode::Create,
      draft: D::default(),
      targets,
      record_key: true,
    }
  }

  /// Skip the record's own key after an edit. For records whose
  /// `/{collection}/{id}` path is read as something else.
  pub fn without_record_key(mut self) -> Self {
    self.record_key = false;
    self
  }

  /// Open blank for create, or populated from `record` for edit.
  pub fn open(&mut self, record: Option<&D::Record>) {
    match record {
      Some(record) => {
        self.mode = FormMode::Edit(record.id().clone());
        self.draft = D::from_record(record);
      }
      None => {
        self.mode = FormMode::Create;
        self.draft = D::default();
      }
    }
    self.phase = FormPhase::Open;
  }

  /// Open in `mode`, populated from `record` when there is one.
  pub fn open_as(&mut self, record: Option<&D::Record>, mode: FormMode) {
    self.draft = record.map(D::from_record).unwrap_or_default();
    self.mode = mode;
    self.phase = FormPhase::Open;
  }

  /// Open for create with a prepared draft.
  pub fn open_with(&mut self, draft: D) {
    self.mode = FormMode::Create;
    self.draft = draft;
    self.phase = FormPhase::Open;
  }

  /// Discard the draft.
  pub fn close(&mut self) {
    self.phase = FormPhase::Closed;
    self.mode = FormMode::Create;
    self.draft = D::default();
  }

  pub fn phase(&self) -> FormPhase {
    self.phase
  }

  pub fn mode(&self) -> &FormMode {
    &self.mode
  }

  pub fn is_open(&self) -> bool {
    self.phase != FormPhase::Closed
  }

  pub fn is_submitting(&self) -> bool {
    self.phase == FormPhase::Submitting
  }

  pub fn draft(&self) -> &D {
    &self.draft
  }

  /// Typed access to the draft. `None` unless the form is open and idle.
  pub fn draft_mut(&mut self) -> Option<&mut D> {
    (self.phase == FormPhase::Open).then_some(&mut self.draft)
  }

  pub fn fields(&self) -> Vec<FieldSpec> {
    self.draft.fields()
  }

  pub fn targets(&self) -> &[QueryKey] {
    &self.targets
  }

  fn editable(&mut self) -> Result<&mut D, FieldError> {
    match self.phase {
      FormPhase::Open => Ok(&mut self.draft),
      FormPhase::Submitting => Err(FieldError::new("", "A submission is already in progress")),
      FormPhase::Closed => Err(FieldError::new("", "Form is not open")),
    }
  }

  /// Local mutation only; nothing is sent.
  pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    self.editable()?.set_field(name, value)
  }

  pub fn add_child(&mut self) -> Result<(), FieldError> {
    self.editable()?.add_child()
  }

  pub fn remove_child(&mut self, index: usize) -> Result<(), FieldError> {
    self.editable()?.remove_child(index)
  }

  /// Validate and build the mutation, moving to `Submitting`.
  ///
  /// A validation failure leaves the form open and sends nothing.
  pub fn begin_submit(&mut self) -> Result<Mutation, SubmitError> {
    match self.phase {
      FormPhase::Closed => return Err(SubmitError::Closed),
      FormPhase::Submitting => return Err(SubmitError::Busy),
      FormPhase::Open => {}
    }
    self.draft.validate(&self.mode)?;

    let fields = self.draft.encode(&self.mode);
    let collection = <D::Record as Resource>::COLLECTION;
    let mutation = match &self.mode {
      FormMode::Create => Mutation::Create { collection, fields },
      FormMode::Edit(id) => Mutation::Update {
        collection,
        id: id.clone(),
        fields,
      },
      FormMode::Replace => Mutation::Action {
        path: <D::Record as Resource>::list_path(),
        fields,
      },
    };
    self.phase = FormPhase::Submitting;
    debug!(collection, verb = mutation.verb(), "submitting");
    Ok(mutation)
  }

  /// Apply the outcome of a submission started by [`FormState::begin_submit`].
  ///
  /// Success closes the form and invalidates every target key (plus the
  /// record's own key when editing). Failure reopens it with the draft intact.
  pub fn finish(
    &mut self,
    result: Result<Outcome, ClientError>,
    cache: &QueryCache,
  ) -> Result<Outcome, SubmitError> {
    if self.phase != FormPhase::Submitting {
      return Err(SubmitError::Closed);
    }
    match result {
      Ok(outcome) => {
        for key in &self.targets {
          cache.invalidate(key);
        }
        if let (true, FormMode::Edit(id)) = (self.record_key, &self.mode) {
          cache.invalidate(&QueryKey::detail::<D::Record>(
            id,
            cache.client().session(),
          ));
        }
        info!(
          collection = <D::Record as Resource>::COLLECTION,
          "saved"
        );
        self.close();
        Ok(outcome)
      }
      Err(e) => {
        self.phase = FormPhase::Open;
        Err(SubmitError::Failed(e))
      }
    }
  }

  /// Validate, send and apply the result in one step.
  pub async fn submit(&mut self, cache: &QueryCache) -> Result<Outcome, SubmitError> {
    let mutation = self.begin_submit()?;
    let result = cache.client().execute(mutation).await;
    self.finish(result, cache)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Credential, HttpMethod, MemoryBackend, ResourceClient, Session};
  use crate::resources::{Tag, TagDraft, TaxSetting, TaxSettingDraft, Workflow, WorkflowDraft};
  use serde_json::json;
  use std::sync::Arc;

  fn setup() -> (Arc<MemoryBackend>, QueryCache) {
    let backend = Arc::new(MemoryBackend::new());
    let client = ResourceClient::new(backend.clone(), Session::new(Credential::new("t0k"), None));
    (backend, QueryCache::new(client))
  }

  fn tag_form(cache: &QueryCache) -> FormState<TagDraft> {
    FormState::new(vec![QueryKey::list::<Tag>(cache.client().session())])
  }

  #[test]
  fn test_open_create_and_edit() {
    let mut form: FormState<TagDraft> = FormState::new(Vec::new());
    assert_eq!(form.phase(), FormPhase::Closed);
    assert!(form.draft_mut().is_none());

    form.open(None);
    assert_eq!(form.mode(), &FormMode::Create);
    assert_eq!(form.draft().name, "");

    let tag: Tag = serde_json::from_value(json!({"id": 5, "name": "VIP"})).unwrap();
    form.open(Some(&tag));
    assert_eq!(form.mode(), &FormMode::Edit(RecordId::from(5u64)));
    assert_eq!(form.draft().name, "VIP");
  }

  #[tokio::test]
  async fn test_invalid_draft_sends_nothing() {
    let (backend, cache) = setup();
    let mut form: FormState<TaxSettingDraft> =
      FormState::new(vec![QueryKey::list::<TaxSetting>(cache.client().session())]);
    form.open(None);
    form.set_field("code", FieldValue::text("GST")).unwrap();

    for rate in ["-1", "101"] {
      form.set_field("rate", FieldValue::text(rate)).unwrap();
      let err = form.submit(&cache).await.unwrap_err();
      assert!(matches!(err, SubmitError::Invalid(ref f) if f.field == "rate"));
      assert_eq!(form.phase(), FormPhase::Open);
    }
    assert_eq!(backend.total_calls(), 0);

    for rate in ["0", "100"] {
      form.open(None);
      form.set_field("code", FieldValue::text("GST")).unwrap();
      form.set_field("rate", FieldValue::text(rate)).unwrap();
      assert!(form.submit(&cache).await.is_ok());
    }
    assert_eq!(backend.calls(HttpMethod::Post, "/tax-settings"), 2);
  }

  #[tokio::test]
  async fn test_submissions_are_serialized() {
    let (_backend, cache) = setup();
    let mut form = tag_form(&cache);
    form.open(None);
    form.set_field("name", FieldValue::text("VIP")).unwrap();

    let mutation = form.begin_submit().unwrap();
    assert!(matches!(mutation, Mutation::Create { collection: "tags", .. }));
    assert_eq!(form.begin_submit().unwrap_err(), SubmitError::Busy);
    assert!(form.set_field("name", FieldValue::text("x")).is_err());
    assert!(form.draft_mut().is_none());
  }

  #[tokio::test]
  async fn test_failure_reopens_with_draft() {
    let (backend, cache) = setup();
    let mut form = tag_form(&cache);
    form.open(None);
    form.set_field("name", FieldValue::text("VIP")).unwrap();

    backend.fail_next(ClientError::server("The name has already been taken."));
    let err = form.submit(&cache).await.unwrap_err();

    assert_eq!(err.to_string(), "The name has already been taken.");
    assert_eq!(form.phase(), FormPhase::Open);
    assert_eq!(form.draft().name, "VIP");
  }

  #[tokio::test]
  async fn test_success_closes_and_invalidates() {
    let (backend, cache) = setup();
    backend.seed("tags", vec![json!({"id": 1, "name": "Old"})]);
    let key = QueryKey::list::<Tag>(cache.client().session());
    cache.fetch(&key).await.unwrap();
    let generation = cache.generation(&key);

    let mut form = tag_form(&cache);
    form.open(None);
    form.set_field("name", FieldValue::text("VIP")).unwrap();
    form.submit(&cache).await.unwrap();
    assert_eq!(form.phase(), FormPhase::Closed);

    let snap = cache.fetch(&key).await.unwrap();
    assert!(snap.generation > generation);
    let names: Vec<String> = snap.decode::<Tag>().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["Old", "VIP"]);
  }

  #[test]
  fn test_sole_stage_removal_through_form() {
    let mut form: FormState<WorkflowDraft> = FormState::new(Vec::new());
    form.open(None);
    let err = form.remove_child(0).unwrap_err();
    assert_eq!(err.message, "Workflow must have at least one stage");
    assert_eq!(form.draft().stages.len(), 1);

    let record: Workflow = serde_json::from_value(json!({
      "id": 1, "name": "Visa", "stages": [{"id": 2, "name": "Lodged"}]
    }))
    .unwrap();
    form.open(Some(&record));
    assert!(form.remove_child(0).is_err());
    assert_eq!(form.draft().stages.len(), 1);
  }

  #[test]
  fn test_closed_form_rejects_submit() {
    let mut form: FormState<TagDraft> = FormState::new(Vec::new());
    assert_eq!(form.begin_submit().unwrap_err(), SubmitError::Closed);
  }
}
