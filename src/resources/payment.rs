use serde::{Deserialize, Serialize};

use super::{require, Column, Draft, FieldKind, FieldSpec, FieldValue, IdSet, Resource};
use crate::api::{FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;

/// Invoice types a manual payment detail can be printed on.
pub const INVOICE_TYPES: &[&str] = &[
  "Net Commission Invoice",
  "Client General Invoice",
  "Partner General Invoice",
  "Tax Invoice",
  "Proformance Invoice",
  "Gross Commission Invoice",
  "Group Invoice",
];

/// Bank/payment instructions printed on invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualPaymentDetail {
  pub id: RecordId,
  pub name: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub invoice_types: Vec<String>,
}

const COLUMNS: &[Column] = &[
  Column::new("Name", 24),
  Column::new("Invoice Types", 48),
];

impl Resource for ManualPaymentDetail {
  type Draft = ManualPaymentDraft;

  const COLLECTION: &'static str = "manual-payment-details";
  const LABEL: &'static str = "Manual Payment Details";
  const NOUN: &'static str = "payment detail";

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
    vec![self.name.clone(), self.invoice_types.join(", ")]
  }

  fn details(&self) -> Vec<(&'static str, String)> {
    vec![
      ("Name", self.name.clone()),
      ("Content", self.content.clone()),
      ("Invoice Types", self.invoice_types.join(", ")),
    ]
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualPaymentDraft {
  pub name: String,
  pub content: String,
  pub invoice_types: IdSet,
}

impl Draft for ManualPaymentDraft {
  type Record = ManualPaymentDetail;

  fn from_record(record: &ManualPaymentDetail) -> Self {
    Self {
      name: record.name.clone(),
      content: record.content.clone(),
      invoice_types: record.invoice_types.iter().map(String::as_str).collect(),
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    vec![
      FieldSpec::new("name", "Name", FieldKind::Text)
        .value(&self.name)
        .required(),
      FieldSpec::new("content", "Content", FieldKind::Multiline)
        .value(&self.content)
        .required(),
      FieldSpec::new("invoice_types", "Invoice types", FieldKind::Ids)
        .value(self.invoice_types.display())
        .required(),
    ]
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    match name {
      "name" => self.name = value.into_text(name)?,
      "content" => self.content = value.into_text(name)?,
      "invoice_types" => self.invoice_types = value.into_ids(name)?,
      _ => return Err(FieldError::unknown(name)),
    }
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    require("name", &self.name, "Name is required")?;
    require("content", &self.content, "Content is required")?;
    if self.invoice_types.is_empty() {
      return Err(FieldError::new(
        "invoice_types",
        "Select at least one invoice type",
      ));
    }
    if let Some(unknown) = self
      .invoice_types
      .iter()
      .find(|t| !INVOICE_TYPES.contains(t))
    {
      return Err(FieldError::new(
        "invoice_types",
        format!("Unknown invoice type '{}'", unknown),
      ));
    }
    Ok(())
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    fields
      .text("name", self.name.trim())
      .text("content", self.content.trim())
      .repeated("invoice_types", self.invoice_types.iter());
    fields
  }
}
