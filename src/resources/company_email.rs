use serde::{Deserialize, Serialize};

use super::{require, Column, Draft, FieldKind, FieldSpec, FieldValue, IdSet, Resource, Status};
use crate::api::{de_ids, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;
use crate::lookup::Lookup;

pub const INCOMING_TYPES: &[&str] = &["all", "associated_only"];

/// Shared company mailbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyEmail {
  pub id: RecordId,
  pub email_id: String,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub signature: Option<String>,
  #[serde(default)]
  pub status: Status,
  #[serde(default)]
  pub incoming_type: String,
  #[serde(default, deserialize_with = "de_ids")]
  pub shared_users: Vec<RecordId>,
}

const COLUMNS: &[Column] = &[
  Column::new("Email", 32),
  Column::new("Display Name", 20),
  Column::new("Incoming", 16),
  Column::new("Status", 10),
  Column::new("Shared", 7),
];

impl Resource for CompanyEmail {
  type Draft = CompanyEmailDraft;

  const COLLECTION: &'static str = "company-emails";
  const LABEL: &'static str = "Company Emails";
  const NOUN: &'static str = "email";

  fn id(&self) -> &RecordId {
    &self.id
  }

  fn title(&self) -> &str {
    &self.email_id
  }

  fn columns() -> &'static [Column] {
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.email_id.clone(),
      self.display_name.clone().unwrap_or_default(),
      self.incoming_type.clone(),
      self.status.label().to_string(),
      self.shared_users.len().to_string(),
    ]
  }

  fn details(&self) -> Vec<(&'static str, String)> {
    vec![
      ("Email", self.email_id.clone()),
      ("Display Name", self.display_name.clone().unwrap_or_default()),
      ("Signature", self.signature.clone().unwrap_or_default()),
      ("Incoming", self.incoming_type.clone()),
      ("Status", self.status.label().to_string()),
      (
        "Shared Users",
        self
          .shared_users
          .iter()
          .map(RecordId::as_str)
          .collect::<Vec<_>>()
          .join(", "),
      ),
    ]
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyEmailDraft {
  pub email_id: String,
  pub display_name: String,
  pub signature: String,
  pub active: bool,
  pub incoming_type: String,
  pub shared_users: IdSet,
}

impl Default for CompanyEmailDraft {
  fn default() -> Self {
    Self {
      email_id: String::new(),
      display_name: String::new(),
      signature: String::new(),
      active: true,
      incoming_type: "all".to_string(),
      shared_users: IdSet::new(),
    }
  }
}

impl Draft for CompanyEmailDraft {
  type Record = CompanyEmail;

  fn from_record(record: &CompanyEmail) -> Self {
    Self {
      email_id: record.email_id.clone(),
      display_name: record.display_name.clone().unwrap_or_default(),
      signature: record.signature.clone().unwrap_or_default(),
      active: record.status.is_active(),
      incoming_type: if record.incoming_type.is_empty() {
        "all".to_string()
      } else {
        record.incoming_type.clone()
      },
      shared_users: record.shared_users.iter().collect(),
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    vec![
      FieldSpec::new("email_id", "Email address", FieldKind::Text)
        .value(&self.email_id)
        .required(),
      FieldSpec::new("display_name", "Display name", FieldKind::Text).value(&self.display_name),
      FieldSpec::new("signature", "Signature", FieldKind::Multiline).value(&self.signature),
      FieldSpec::new("status", "Active", FieldKind::Flag).flag(self.active),
      FieldSpec::new("incoming_type", "Incoming", FieldKind::Choice(INCOMING_TYPES))
        .value(&self.incoming_type),
      FieldSpec::new("shared_users", "Shared users", FieldKind::PickMany(Lookup::Users))
        .value(self.shared_users.display()),
    ]
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    match name {
      "email_id" => self.email_id = value.into_text(name)?,
      "display_name" => self.display_name = value.into_text(name)?,
      "signature" => self.signature = value.into_text(name)?,
      "status" => self.active = value.into_flag(name)?,
      "incoming_type" => self.incoming_type = value.into_choice(name, INCOMING_TYPES)?,
      "shared_users" => self.shared_users = value.into_ids(name)?,
      _ => return Err(FieldError::unknown(name)),
    }
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    require("email_id", &self.email_id, "Email address is required")?;
    if !INCOMING_TYPES.contains(&self.incoming_type.as_str()) {
      return Err(FieldError::new("incoming_type", "Choose an incoming type"));
    }
    Ok(())
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    fields
      .text("email_id", self.email_id.trim())
      .flag("status", self.active)
      .text("incoming_type", self.incoming_type.as_str())
      .optional_text("display_name", &self.display_name)
      .optional_text("signature", &self.signature)
      .indexed("shared_users", self.shared_users.iter());
    fields
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_status_from_numeric_flag() {
    let email: CompanyEmail = serde_json::from_value(json!({
      "id": 2,
      "email_id": "admissions@agency.test",
      "status": 0,
      "incoming_type": "associated_only",
      "shared_users": [5, 8]
    }))
    .unwrap();

    assert_eq!(email.status, Status::Inactive);
    let draft = CompanyEmailDraft::from_record(&email);
    assert!(!draft.active);
    assert!(draft.shared_users.contains("8"));
  }

  #[test]
  fn test_encode_shared_users_indexed() {
    let mut draft = CompanyEmailDraft {
      email_id: "info@agency.test".into(),
      ..Default::default()
    };
    draft
      .set_field("shared_users", FieldValue::text("12, 4"))
      .unwrap();

    let fields = draft.encode(&FormMode::Create);
    assert_eq!(fields.get("shared_users[0]"), Some("12"));
    assert_eq!(fields.get("shared_users[1]"), Some("4"));
    assert_eq!(fields.get("status"), Some("1"));
    assert_eq!(fields.get("display_name"), None);
  }

  #[test]
  fn test_incoming_type_must_be_known() {
    let mut draft = CompanyEmailDraft::default();
    assert!(draft
      .set_field("incoming_type", FieldValue::text("everyone"))
      .is_err());
    assert_eq!(draft.incoming_type, "all");
  }
}
