use serde::{Deserialize, Serialize};

use super::{require, short_date, Column, Draft, FieldKind, FieldSpec, FieldValue, Resource};
use crate::api::{de_text, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;

/// Who created a record, as embedded by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
}

/// Contact tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
  pub id: RecordId,
  pub name: String,
  #[serde(default, deserialize_with = "de_text")]
  pub usage_count: String,
  #[serde(default)]
  pub created_by: Option<Author>,
  #[serde(default, deserialize_with = "de_text")]
  pub created_at: String,
}

const COLUMNS: &[Column] = &[
  Column::new("Tag Name", 28),
  Column::new("Usage", 8),
  Column::new("Created By", 24),
  Column::new("Created At", 14),
];

impl Resource for Tag {
  type Draft = TagDraft;

  const COLLECTION: &'static str = "tags";
  const LABEL: &'static str = "Tags";
  const NOUN: &'static str = "tag";

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
      if self.usage_count.is_empty() {
        "0".to_string()
      } else {
        self.usage_count.clone()
      },
      self
        .created_by
        .as_ref()
        .map(|a| a.name.clone())
        .unwrap_or_default(),
      short_date(&self.created_at),
    ]
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDraft {
  pub name: String,
}

impl Draft for TagDraft {
  type Record = Tag;

  fn from_record(record: &Tag) -> Self {
    Self {
      name: record.name.clone(),
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    vec![FieldSpec::new("name", "Tag name", FieldKind::Text)
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
    require("name", &self.name, "Tag name is required")
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    fields.text("name", self.name.trim());
    fields
  }
}
