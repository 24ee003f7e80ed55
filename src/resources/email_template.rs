use serde::{Deserialize, Serialize};

use super::{require, Column, Draft, FieldKind, FieldSpec, FieldValue, Resource};
use crate::api::{de_text, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;

/// Email template. Only the `email` type is managed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
  pub id: RecordId,
  pub title: String,
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub body: Option<String>,
  #[serde(default)]
  pub body_preview: Option<String>,
  #[serde(default, deserialize_with = "de_text")]
  pub attachments_count: String,
  #[serde(default, deserialize_with = "de_text")]
  pub updated_at: String,
}

impl EmailTemplate {
  fn preview(&self) -> &str {
    self
      .body_preview
      .as_deref()
      .or(self.body.as_deref())
      .unwrap_or("")
  }
}

const COLUMNS: &[Column] = &[
  Column::new("Title", 24),
  Column::new("Subject", 32),
  Column::new("Preview", 40),
];

impl Resource for EmailTemplate {
  type Draft = EmailTemplateDraft;

  const COLLECTION: &'static str = "email-templates";
  const LABEL: &'static str = "Email Templates";
  const NOUN: &'static str = "template";

  fn id(&self) -> &RecordId {
    &self.id
  }

  fn title(&self) -> &str {
    &self.title
  }

  fn list_path() -> String {
    format!("/{}?type=email", Self::COLLECTION)
  }

  fn columns() -> &'static [Column] {
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.title.clone(),
      self.subject.clone(),
      self.preview().replace('\n', " "),
    ]
  }

  fn details(&self) -> Vec<(&'static str, String)> {
    vec![
      ("Title", self.title.clone()),
      ("Subject", self.subject.clone()),
      ("Body", self.preview().to_string()),
      (
        "Attachments",
        if self.attachments_count.is_empty() {
          "0".to_string()
        } else {
          self.attachments_count.clone()
        },
      ),
      ("Updated", self.updated_at.clone()),
    ]
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailTemplateDraft {
  pub title: String,
  pub subject: String,
  pub body: String,
}

impl Draft for EmailTemplateDraft {
  type Record = EmailTemplate;

  fn from_record(record: &EmailTemplate) -> Self {
    Self {
      title: record.title.clone(),
      subject: record.subject.clone(),
      body: record.body.clone().unwrap_or_default(),
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    vec![
      FieldSpec::new("title", "Title", FieldKind::Text)
        .value(&self.title)
        .required(),
      FieldSpec::new("subject", "Subject", FieldKind::Text)
        .value(&self.subject)
        .required(),
      FieldSpec::new("body", "Body", FieldKind::Multiline)
        .value(&self.body)
        .required(),
    ]
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    match name {
      "title" => self.title = value.into_text(name)?,
      "subject" => self.subject = value.into_text(name)?,
      "body" => self.body = value.into_text(name)?,
      _ => return Err(FieldError::unknown(name)),
    }
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    require("title", &self.title, "Title is required")?;
    require("subject", &self.subject, "Subject is required")?;
    require("body", &self.body, "Body is required")
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    fields
      .text("title", self.title.trim())
      .text("subject", self.subject.trim())
      .text("body", self.body.trim());
    fields
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_list_path_filters_email_type() {
    assert_eq!(EmailTemplate::list_path(), "/email-templates?type=email");
  }

  #[test]
  fn test_validation_order() {
    let draft = EmailTemplateDraft {
      title: "Welcome".into(),
      ..Default::default()
    };
    assert_eq!(
      draft.validate(&FormMode::Create).unwrap_err().message,
      "Subject is required"
    );
  }
}
