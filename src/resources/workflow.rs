use serde::{Deserialize, Serialize};

use super::{require, Column, Draft, FieldKind, FieldSpec, FieldValue, IdSet, Resource};
use crate::api::{de_flag, de_ids, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;

pub const ACCESS_TYPES: &[&str] = &["all", "selected"];

/// Boolean stage options, in display and encoding order.
const STAGE_FLAGS: &[(&str, &str)] = &[
  ("is_win_stage", "win stage"),
  ("require_partner_client_id", "require partner client id"),
  ("add_start_and_end_date", "start/end date"),
  ("add_note", "note"),
  ("add_application_intake_field", "intake field"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStage {
  #[serde(default)]
  pub id: Option<RecordId>,
  pub name: String,
  #[serde(default, deserialize_with = "de_flag")]
  pub is_win_stage: bool,
  #[serde(default, deserialize_with = "de_flag")]
  pub require_partner_client_id: bool,
  #[serde(default, deserialize_with = "de_flag")]
  pub add_start_and_end_date: bool,
  #[serde(default, deserialize_with = "de_flag")]
  pub add_note: bool,
  #[serde(default, deserialize_with = "de_flag")]
  pub add_application_intake_field: bool,
}

/// Application workflow: an ordered list of stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub id: RecordId,
  pub name: String,
  #[serde(default)]
  pub access_type: String,
  #[serde(default, deserialize_with = "de_ids")]
  pub selected_offices: Vec<RecordId>,
  #[serde(default)]
  pub stages: Vec<WorkflowStage>,
}

const COLUMNS: &[Column] = &[
  Column::new("Name", 32),
  Column::new("Access", 10),
  Column::new("Stages", 8),
];

impl Resource for Workflow {
  type Draft = WorkflowDraft;

  const COLLECTION: &'static str = "workflows";
  const LABEL: &'static str = "Workflows";
  const NOUN: &'static str = "workflow";

  fn id(&self) -> &RecordId {
    &self.id
  }

  fn title(&self) -> &str {
    &self.name
  }

  fn columns() -> &'static [Column] {
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.name.clone(),
      self.access_type.clone(),
      self.stages.len().to_string(),
    ]
  }

  fn details(&self) -> Vec<(&'static str, String)> {
    let mut out = vec![
      ("Name", self.name.clone()),
      ("Access", self.access_type.clone()),
    ];
    if !self.selected_offices.is_empty() {
      out.push((
        "Offices",
        self
          .selected_offices
          .iter()
          .map(RecordId::as_str)
          .collect::<Vec<_>>()
          .join(", "),
      ));
    }
    for (i, stage) in self.stages.iter().enumerate() {
      let marker = if stage.is_win_stage { " (win)" } else { "" };
      out.push(("Stage", format!("{}. {}{}", i + 1, stage.name, marker)));
    }
    out
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDraft {
  pub id: Option<RecordId>,
  pub name: String,
  pub is_win_stage: bool,
  pub require_partner_client_id: bool,
  pub add_start_and_end_date: bool,
  pub add_note: bool,
  pub add_application_intake_field: bool,
}

impl StageDraft {
  fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
    match name {
      "is_win_stage" => Some(&mut self.is_win_stage),
      "require_partner_client_id" => Some(&mut self.require_partner_client_id),
      "add_start_and_end_date" => Some(&mut self.add_start_and_end_date),
      "add_note" => Some(&mut self.add_note),
      "add_application_intake_field" => Some(&mut self.add_application_intake_field),
      _ => None,
    }
  }

  fn flag(&self, name: &str) -> bool {
    match name {
      "is_win_stage" => self.is_win_stage,
      "require_partner_client_id" => self.require_partner_client_id,
      "add_start_and_end_date" => self.add_start_and_end_date,
      "add_note" => self.add_note,
      "add_application_intake_field" => self.add_application_intake_field,
      _ => false,
    }
  }
}

impl From<&WorkflowStage> for StageDraft {
  fn from(stage: &WorkflowStage) -> Self {
    Self {
      id: stage.id.clone(),
      name: stage.name.clone(),
      is_win_stage: stage.is_win_stage,
      require_partner_client_id: stage.require_partner_client_id,
      add_start_and_end_date: stage.add_start_and_end_date,
      add_note: stage.add_note,
      add_application_intake_field: stage.add_application_intake_field,
    }
  }
}

/// Workflow form. Always holds at least one stage.
///
/// Stage fields are addressed as `stages.{index}.{field}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDraft {
  pub name: String,
  pub access_type: String,
  pub selected_offices: IdSet,
  pub stages: Vec<StageDraft>,
}

impl Default for WorkflowDraft {
  fn default() -> Self {
    Self {
      name: String::new(),
      access_type: "all".to_string(),
      selected_offices: IdSet::new(),
      stages: vec![StageDraft::default()],
    }
  }
}

fn stage_field(name: &str) -> Option<(usize, &str)> {
  let rest = name.strip_prefix("stages.")?;
  let (index, field) = rest.split_once('.')?;
  Some((index.parse().ok()?, field))
}

impl Draft for WorkflowDraft {
  type Record = Workflow;

  fn from_record(record: &Workflow) -> Self {
    let mut stages: Vec<StageDraft> = record.stages.iter().map(StageDraft::from).collect();
    if stages.is_empty() {
      stages.push(StageDraft::default());
    }
    Self {
      name: record.name.clone(),
      access_type: if record.access_type.is_empty() {
        "all".to_string()
      } else {
        record.access_type.clone()
      },
      selected_offices: record.selected_offices.iter().collect(),
      stages,
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    let mut fields = vec![
      FieldSpec::new("name", "Workflow name", FieldKind::Text)
        .value(&self.name)
        .required(),
      FieldSpec::new("access_type", "Access", FieldKind::Choice(ACCESS_TYPES))
        .value(&self.access_type),
    ];
    if self.access_type == "selected" {
      fields.push(
        FieldSpec::new("selected_offices", "Office ids", FieldKind::Ids)
          .value(self.selected_offices.display()),
      );
    }
    for (i, stage) in self.stages.iter().enumerate() {
      fields.push(
        FieldSpec::new(
          format!("stages.{}.name", i),
          format!("Stage {}", i + 1),
          FieldKind::Text,
        )
        .value(&stage.name)
        .required(),
      );
      for (flag, label) in STAGE_FLAGS {
        fields.push(
          FieldSpec::new(
            format!("stages.{}.{}", i, flag),
            format!("  {}", label),
            FieldKind::Flag,
          )
          .flag(stage.flag(flag)),
        );
      }
    }
    fields
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    match name {
      "name" => self.name = value.into_text(name)?,
      "access_type" => self.access_type = value.into_choice(name, ACCESS_TYPES)?,
      "selected_offices" => self.selected_offices = value.into_ids(name)?,
      _ => {
        let (index, field) = stage_field(name).ok_or_else(|| FieldError::unknown(name))?;
        let stage = self
          .stages
          .get_mut(index)
          .ok_or_else(|| FieldError::unknown(name))?;
        if field == "name" {
          stage.name = value.into_text(name)?;
        } else {
          let slot = stage.flag_mut(field).ok_or_else(|| FieldError::unknown(name))?;
          *slot = value.into_flag(name)?;
        }
      }
    }
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    require("name", &self.name, "Workflow name is required")?;
    if !ACCESS_TYPES.contains(&self.access_type.as_str()) {
      return Err(FieldError::new("access_type", "Choose who can access this workflow"));
    }
    if self.stages.is_empty() {
      return Err(FieldError::new("stages", "Add at least one stage"));
    }
    if let Some(i) = self.stages.iter().position(|s| s.name.trim().is_empty()) {
      return Err(FieldError::new(
        format!("stages.{}.name", i),
        "All stages must have a name",
      ));
    }
    Ok(())
  }

  fn encode(&self, mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    fields
      .text("name", self.name.trim())
      .text("access_type", self.access_type.as_str());
    if self.access_type == "selected" {
      fields.repeated("selected_offices", self.selected_offices.iter());
    }
    for (i, stage) in self.stages.iter().enumerate() {
      if let (FormMode::Edit(_), Some(id)) = (mode, &stage.id) {
        fields.text(FormFields::nested_name("stages", i, "id"), id.as_str());
      }
      fields.text(FormFields::nested_name("stages", i, "name"), stage.name.trim());
      for (flag, _) in STAGE_FLAGS {
        fields.flag(FormFields::nested_name("stages", i, flag), stage.flag(flag));
      }
    }
    fields
  }

  fn add_child(&mut self) -> Result<(), FieldError> {
    self.stages.push(StageDraft::default());
    Ok(())
  }

  fn remove_child(&mut self, index: usize) -> Result<(), FieldError> {
    if self.stages.len() <= 1 {
      return Err(FieldError::new(
        "stages",
        "Workflow must have at least one stage",
      ));
    }
    if index >= self.stages.len() {
      return Err(FieldError::new("stages", format!("No stage {}", index + 1)));
    }
    self.stages.remove(index);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_sole_stage_cannot_be_removed() {
    let mut draft = WorkflowDraft::default();
    assert_eq!(draft.stages.len(), 1);

    let err = draft.remove_child(0).unwrap_err();
    assert_eq!(err.message, "Workflow must have at least one stage");
    assert_eq!(draft.stages.len(), 1);
  }

  #[test]
  fn test_add_then_remove_stage() {
    let mut draft = WorkflowDraft::default();
    draft.add_child().unwrap();
    draft
      .set_field("stages.1.name", FieldValue::text("Offer"))
      .unwrap();
    draft.remove_child(0).unwrap();
    assert_eq!(draft.stages.len(), 1);
    assert_eq!(draft.stages[0].name, "Offer");
  }

  #[test]
  fn test_unnamed_stage_rejected() {
    let mut draft = WorkflowDraft {
      name: "Student visa".into(),
      ..Default::default()
    };
    let err = draft.validate(&FormMode::Create).unwrap_err();
    assert_eq!(err.message, "All stages must have a name");
    assert_eq!(err.field, "stages.0.name");

    draft
      .set_field("stages.0.name", FieldValue::text("Lodged"))
      .unwrap();
    assert!(draft.validate(&FormMode::Create).is_ok());
  }

  #[test]
  fn test_set_stage_flag_and_unknown_fields() {
    let mut draft = WorkflowDraft::default();
    draft
      .set_field("stages.0.is_win_stage", FieldValue::Flag(true))
      .unwrap();
    assert!(draft.stages[0].is_win_stage);

    assert!(draft.set_field("stages.3.name", FieldValue::text("x")).is_err());
    assert!(draft.set_field("stages.0.colour", FieldValue::Flag(true)).is_err());
    assert!(draft.set_field("stages", FieldValue::text("x")).is_err());
  }

  #[test]
  fn test_encode_edit_keeps_stage_ids() {
    let record: Workflow = serde_json::from_value(json!({
      "id": 4,
      "name": "Admission",
      "access_type": "selected",
      "selected_offices": [1, 2],
      "stages": [
        {"id": 10, "name": "Applied", "is_win_stage": 0},
        {"id": 11, "name": "Enrolled", "is_win_stage": 1}
      ]
    }))
    .unwrap();
    let mut draft = WorkflowDraft::from_record(&record);
    draft.add_child().unwrap();
    draft
      .set_field("stages.2.name", FieldValue::text(" Graduated "))
      .unwrap();

    let fields = draft.encode(&FormMode::Edit(record.id.clone()));
    assert_eq!(fields.get("stages[0][id]"), Some("10"));
    assert_eq!(fields.get("stages[1][is_win_stage]"), Some("1"));
    assert_eq!(fields.get("stages[2][id]"), None);
    assert_eq!(fields.get("stages[2][name]"), Some("Graduated"));
    assert_eq!(fields.get_all("selected_offices[]"), vec!["1", "2"]);
  }

  #[test]
  fn test_offices_only_sent_for_selected_access() {
    let mut draft = WorkflowDraft {
      name: "General".into(),
      ..Default::default()
    };
    draft.selected_offices = IdSet::parse("selected_offices", "3").unwrap();
    let fields = draft.encode(&FormMode::Create);
    assert!(fields.get_all("selected_offices[]").is_empty());
    assert_eq!(fields.get("stages[0][add_note]"), Some("0"));
  }
}
