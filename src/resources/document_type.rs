use serde::{Deserialize, Serialize};

use super::{require, short_date, Column, Draft, FieldKind, FieldSpec, FieldValue, Resource};
use crate::api::{de_text, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;

/// Kind of document a checklist item asks for (passport, transcript, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentType {
  pub id: RecordId,
  pub name: String,
  #[serde(default, deserialize_with = "de_text")]
  pub created_at: String,
}

const COLUMNS: &[Column] = &[Column::new("Name", 40), Column::new("Created At", 14)];

impl Resource for DocumentType {
  type Draft = DocumentTypeDraft;

  const COLLECTION: &'static str = "document-types";
  const LABEL: &'static str = "Document Types";
  const NOUN: &'static str = "document type";

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
    vec![self.name.clone(), short_date(&self.created_at)]
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTypeDraft {
  pub name: String,
}

impl Draft for DocumentTypeDraft {
  type Record = DocumentType;

  fn from_record(record: &DocumentType) -> Self {
    Self {
      name: record.name.clone(),
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    vec![FieldSpec::new("name", "Document type name", FieldKind::Text)
      .value(&self.name)
      .required()]
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    match name {
      "name" => self.name = value.into_text(name)?,
      _ => return Err(FieldError::unknown(name)),
    }
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    require("name", &self.name, "Document type name is required")
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    fields.text("name", self.name.trim());
    fields
  }
}
