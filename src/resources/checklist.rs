use serde::{Deserialize, Serialize};

use super::{require, Column, Draft, FieldKind, FieldSpec, FieldValue, IdSet, Resource};
use crate::api::{de_flag, de_ids, de_text, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;
use crate::lookup::Lookup;

pub const APPLY_TO: &[&str] = &["all", "selected"];

/// Entry of the checklist workflow lists (`?checklist_available=0|1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistWorkflow {
  pub id: RecordId,
  pub name: String,
  #[serde(default, deserialize_with = "de_text")]
  pub stages_count: String,
}

/// Full checklist of one workflow, grouped by stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowChecklist {
  pub id: RecordId,
  pub name: String,
  #[serde(default)]
  pub stages: Vec<ChecklistStage>,
}

impl WorkflowChecklist {
  pub fn item_count(&self) -> usize {
    self.stages.iter().map(|s| s.checklists.len()).sum()
  }

  /// Stage owning the item, if any.
  pub fn stage_of(&self, item: &RecordId) -> Option<&ChecklistStage> {
    self
      .stages
      .iter()
      .find(|s| s.checklists.iter().any(|c| &c.id == item))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistStage {
  pub id: RecordId,
  pub name: String,
  #[serde(default, deserialize_with = "de_text")]
  pub order: String,
  #[serde(default)]
  pub checklists: Vec<ChecklistItem>,
}

/// Document required at a workflow stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
  pub id: RecordId,
  #[serde(default, deserialize_with = "de_text")]
  pub document_type_id: String,
  #[serde(default)]
  pub document_type_name: Option<String>,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub apply_to: String,
  #[serde(default, deserialize_with = "de_ids")]
  pub selected_partners: Vec<RecordId>,
  #[serde(default, deserialize_with = "de_flag")]
  pub allow_client_upload: bool,
  #[serde(default, deserialize_with = "de_flag")]
  pub is_mandatory: bool,
}

const COLUMNS: &[Column] = &[
  Column::new("Document", 24),
  Column::new("Description", 36),
  Column::new("Applies To", 10),
  Column::new("Mandatory", 9),
  Column::new("Upload", 6),
];

impl Resource for ChecklistItem {
  type Draft = ChecklistItemDraft;

  const COLLECTION: &'static str = "document-checklists";
  const LABEL: &'static str = "Document Checklists";
  const NOUN: &'static str = "checklist item";

  fn id(&self) -> &RecordId {
    &self.id
  }

  fn title(&self) -> &str {
    &self.description
  }

  fn columns() -> &'static [Column] {
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    let yes = |b: bool| if b { "yes" } else { "" }.to_string();
    vec![
      self
        .document_type_name
        .clone()
        .unwrap_or_else(|| self.document_type_id.clone()),
      self.description.clone(),
      if self.apply_to == "selected" {
        "selected".to_string()
      } else {
        "all".to_string()
      },
      yes(self.is_mandatory),
      yes(self.allow_client_upload),
    ]
  }
}

/// Checklist item form. `workflow_id` and `workflow_stage_id` are only sent
/// on create; an item never moves between stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItemDraft {
  pub workflow_id: String,
  pub workflow_stage_id: String,
  pub document_type_id: String,
  pub description: String,
  pub apply_to: String,
  pub selected_partners: IdSet,
  pub allow_client_upload: bool,
  pub is_mandatory: bool,
}

impl Default for ChecklistItemDraft {
  fn default() -> Self {
    Self {
      workflow_id: String::new(),
      workflow_stage_id: String::new(),
      document_type_id: String::new(),
      description: String::new(),
      apply_to: "all".to_string(),
      selected_partners: IdSet::new(),
      allow_client_upload: false,
      is_mandatory: false,
    }
  }
}

impl ChecklistItemDraft {
  /// Blank item for a stage of `workflow`.
  pub fn for_stage(workflow: &RecordId, stage: Option<&RecordId>) -> Self {
    Self {
      workflow_id: workflow.to_string(),
      workflow_stage_id: stage.map(ToString::to_string).unwrap_or_default(),
      ..Default::default()
    }
  }
}

impl Draft for ChecklistItemDraft {
  type Record = ChecklistItem;

  fn from_record(record: &ChecklistItem) -> Self {
    Self {
      workflow_id: String::new(),
      workflow_stage_id: String::new(),
      document_type_id: record.document_type_id.clone(),
      description: record.description.clone(),
      apply_to: if record.apply_to.is_empty() {
        "all".to_string()
      } else {
        record.apply_to.clone()
      },
      selected_partners: record.selected_partners.iter().collect(),
      allow_client_upload: record.allow_client_upload,
      is_mandatory: record.is_mandatory,
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    let mut fields = Vec::new();
    if !self.workflow_id.is_empty() {
      fields.push(
        FieldSpec::new("workflow_stage_id", "Stage id", FieldKind::Text)
          .value(&self.workflow_stage_id)
          .required(),
      );
    }
    fields.extend([
      FieldSpec::new("document_type_id", "Document type", FieldKind::Pick(Lookup::DocumentTypes))
        .value(&self.document_type_id)
        .required(),
      FieldSpec::new("description", "Description", FieldKind::Multiline)
        .value(&self.description)
        .required(),
      FieldSpec::new("apply_to", "Apply to", FieldKind::Choice(APPLY_TO)).value(&self.apply_to),
    ]);
    if self.apply_to == "selected" {
      fields.push(
        FieldSpec::new("selected_partners", "Partner ids", FieldKind::Ids)
          .value(self.selected_partners.display()),
      );
    }
    fields.push(
      FieldSpec::new("allow_client_upload", "Client upload", FieldKind::Flag)
        .flag(self.allow_client_upload),
    );
    fields.push(FieldSpec::new("is_mandatory", "Mandatory", FieldKind::Flag).flag(self.is_mandatory));
    fields
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    match name {
      "workflow_stage_id" => self.workflow_stage_id = value.into_text(name)?,
      "document_type_id" => self.document_type_id = value.into_text(name)?,
      "description" => self.description = value.into_text(name)?,
      "apply_to" => self.apply_to = value.into_choice(name, APPLY_TO)?,
      "selected_partners" => self.selected_partners = value.into_ids(name)?,
      "allow_client_upload" => self.allow_client_upload = value.into_flag(name)?,
      "is_mandatory" => self.is_mandatory = value.into_flag(name)?,
      _ => return Err(FieldError::unknown(name)),
    }
    Ok(())
  }

  fn validate(&self, mode: &FormMode) -> Result<(), FieldError> {
    if matches!(mode, FormMode::Create) {
      require("workflow_stage_id", &self.workflow_stage_id, "Please select a workflow stage")?;
    }
    require("document_type_id", &self.document_type_id, "Please select a document type")?;
    require("description", &self.description, "Description is required")?;
    if !APPLY_TO.contains(&self.apply_to.as_str()) {
      return Err(FieldError::new("apply_to", "Choose who this item applies to"));
    }
    Ok(())
  }

  fn encode(&self, mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    if matches!(mode, FormMode::Create) {
      fields
        .text("workflow_id", self.workflow_id.as_str())
        .text("workflow_stage_id", self.workflow_stage_id.trim());
    }
    fields
      .text("document_type_id", self.document_type_id.trim())
      .text("description", self.description.trim())
      .text("apply_to", self.apply_to.as_str())
      .flag("allow_client_upload", self.allow_client_upload)
      .flag("is_mandatory", self.is_mandatory);
    if self.apply_to == "selected" {
      fields.repeated("selected_partners", self.selected_partners.iter());
    }
    fields
  }
}
