//! Document checklists: per-workflow, per-stage lists of required documents.

use tracing::info;

use crate::api::{FormFields, Mutation, Outcome, RecordId};
use crate::cache::{ChecklistPath, QueryCache, QueryKey};
use crate::error::ClientError;
use crate::panel::ResourcePanel;
use crate::resources::{ChecklistItem, ChecklistItemDraft};

pub const MARK_CHECKLISTED_PATH: &str = "/document-checklists/mark-workflow-as-checklisted";

/// Keys of the two workflow lists.
pub fn workflow_keys(cache: &QueryCache) -> (QueryKey, QueryKey) {
  let session = cache.client().session();
  (
    QueryKey::path(ChecklistPath::Checklisted, session),
    QueryKey::path(ChecklistPath::Available, session),
  )
}

pub fn detail_key(cache: &QueryCache, workflow: &RecordId) -> QueryKey {
  QueryKey::path(
    ChecklistPath::Detail(workflow.clone()),
    cache.client().session(),
  )
}

/// Mutation that gives a workflow an (empty) checklist.
pub fn mark_checklisted(workflow: &RecordId) -> Mutation {
  let mut fields = FormFields::new();
  fields.text("workflow_id", workflow.as_str());
  Mutation::Action {
    path: MARK_CHECKLISTED_PATH.to_string(),
    fields,
  }
}

/// Invalidate both workflow lists after a successful mark.
pub fn finish_mark(cache: &QueryCache, result: &Result<Outcome, ClientError>) {
  if result.is_ok() {
    let (checklisted, available) = workflow_keys(cache);
    cache.invalidate(&checklisted);
    cache.invalidate(&available);
    info!("workflow marked as checklisted");
  }
}

/// Mark a workflow as checklisted and wait for the result.
pub async fn mark_workflow(cache: &QueryCache, workflow: &RecordId) -> Result<Outcome, ClientError> {
  let result = cache.client().execute(mark_checklisted(workflow)).await;
  finish_mark(cache, &result);
  result
}

/// Item panel of one workflow's checklist.
///
/// Lists from the workflow's detail key; item writes invalidate it and both
/// workflow lists.
pub struct ChecklistBoard {
  workflow: RecordId,
  panel: ResourcePanel<ChecklistItem>,
}

impl ChecklistBoard {
  pub fn new(cache: QueryCache, workflow: RecordId) -> Self {
    let detail = detail_key(&cache, &workflow);
    let (checklisted, available) = workflow_keys(&cache);
    Self {
      panel: ResourcePanel::scoped(cache, detail, vec![checklisted, available]),
      workflow,
    }
  }

  pub fn workflow(&self) -> &RecordId {
    &self.workflow
  }

  pub fn detail_key(&self) -> &QueryKey {
    self.panel.list_key()
  }

  pub fn panel(&self) -> &ResourcePanel<ChecklistItem> {
    &self.panel
  }

  pub fn panel_mut(&mut self) -> &mut ResourcePanel<ChecklistItem> {
    &mut self.panel
  }

  /// Open the item form for create, scoped to `stage` when given.
  pub fn open_create(&mut self, stage: Option<&RecordId>) {
    self
      .panel
      .form_mut()
      .open_with(ChecklistItemDraft::for_stage(&self.workflow, stage));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Credential, Envelope, HttpMethod, MemoryBackend, ResourceClient, Session};
  use crate::resources::{ChecklistItem, ChecklistWorkflow, FieldValue, WorkflowChecklist};
  use serde_json::json;
  use std::sync::Arc;

  fn setup() -> (Arc<MemoryBackend>, QueryCache) {
    let backend = Arc::new(MemoryBackend::new());
    let client = ResourceClient::new(backend.clone(), Session::new(Credential::new("t0k"), None));
    (backend, QueryCache::new(client))
  }

  #[tokio::test]
  async fn test_mark_invalidates_both_lists() {
    let (backend, cache) = setup();
    backend.fixture(
      "/document-checklists?checklist_available=0",
      json!([{"id": 1, "name": "Student visa"}]),
    );
    backend.fixture(
      "/document-checklists?checklist_available=1",
      json!([{"id": 2, "name": "Admission"}]),
    );
    backend.action(
      MARK_CHECKLISTED_PATH,
      Envelope::success(serde_json::Value::Null).with_message("Workflow marked as checklisted"),
    );

    let (checklisted, available) = workflow_keys(&cache);
    let listed: Vec<ChecklistWorkflow> = cache.fetch(&checklisted).await.unwrap().decode_as();
    assert_eq!(listed.len(), 1);
    cache.fetch(&available).await.unwrap();

    let outcome = mark_workflow(&cache, &RecordId::from(2u64)).await.unwrap();
    assert_eq!(outcome.message.as_deref(), Some("Workflow marked as checklisted"));
    assert_eq!(backend.last_form().unwrap().get("workflow_id"), Some("2"));

    cache.fetch(&checklisted).await.unwrap();
    cache.fetch(&available).await.unwrap();
    assert_eq!(
      backend.calls(HttpMethod::Get, "/document-checklists?checklist_available=0"),
      2
    );
    assert_eq!(
      backend.calls(HttpMethod::Get, "/document-checklists?checklist_available=1"),
      2
    );
  }

  #[tokio::test]
  async fn test_item_create_refetches_detail() {
    let (backend, cache) = setup();
    backend.fixture(
      "/document-checklists/3",
      json!({"id": 3, "name": "Student visa", "stages": [
        {"id": 30, "name": "Applied", "order": 1, "checklists": []}
      ]}),
    );
    let mut board = ChecklistBoard::new(cache.clone(), RecordId::from(3u64));
    let detail: WorkflowChecklist = cache.fetch(board.detail_key()).await.unwrap().object().unwrap();
    let stage = detail.stages[0].id.clone();

    board.open_create(Some(&stage));
    let form = board.panel_mut().form_mut();
    form.set_field("document_type_id", FieldValue::text("2")).unwrap();
    form.set_field("description", FieldValue::text("Passport scan")).unwrap();
    board.panel_mut().submit().await.unwrap();

    let sent = backend.last_form().unwrap();
    assert_eq!(sent.get("workflow_id"), Some("3"));
    assert_eq!(sent.get("workflow_stage_id"), Some("30"));
    assert_eq!(backend.calls(HttpMethod::Post, "/document-checklists"), 1);

    cache.fetch(board.detail_key()).await.unwrap();
    assert_eq!(backend.calls(HttpMethod::Get, "/document-checklists/3"), 2);
  }

  #[tokio::test]
  async fn test_item_without_stage_is_rejected_locally() {
    let (backend, cache) = setup();
    let mut board = ChecklistBoard::new(cache, RecordId::from(3u64));
    board.open_create(None);
    let form = board.panel_mut().form_mut();
    form.set_field("document_type_id", FieldValue::text("2")).unwrap();
    form.set_field("description", FieldValue::text("Passport scan")).unwrap();

    assert!(board.panel_mut().submit().await.is_err());
    assert_eq!(
      board.panel().notification().unwrap().message,
      "Please select a workflow stage"
    );
    assert_eq!(backend.total_calls(), 0);
  }

  #[tokio::test]
  async fn test_item_edit_leaves_same_numbered_workflow_alone() {
    let (backend, cache) = setup();
    backend.fixture(
      "/document-checklists/3",
      json!({"id": 3, "name": "Student visa", "stages": []}),
    );
    backend.fixture(
      "/document-checklists/7",
      json!({"id": 7, "name": "Work permit", "stages": []}),
    );
    backend.seed(
      "document-checklists",
      vec![json!({"id": 7, "document_type_id": 2, "description": "Passport scan"})],
    );

    let other = detail_key(&cache, &RecordId::from(7u64));
    cache.fetch(&other).await.unwrap();

    let item: ChecklistItem = serde_json::from_value(
      json!({"id": 7, "document_type_id": 2, "description": "Passport scan", "apply_to": "all"}),
    )
    .unwrap();
    let mut board = ChecklistBoard::new(cache.clone(), RecordId::from(3u64));
    cache.fetch(board.detail_key()).await.unwrap();
    board.panel_mut().open_edit(&item);
    board
      .panel_mut()
      .form_mut()
      .set_field("description", FieldValue::text("Colour passport scan"))
      .unwrap();
    board.panel_mut().submit().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(backend.calls(HttpMethod::Post, "/document-checklists/7"), 1);
    assert_eq!(backend.calls(HttpMethod::Get, "/document-checklists/3"), 2);
    assert_eq!(backend.calls(HttpMethod::Get, "/document-checklists/7"), 1);
    assert!(!cache.snapshot(&other).unwrap().stale);
  }
}
