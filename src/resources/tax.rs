use serde::{Deserialize, Serialize};

use super::{require, Column, Draft, FieldKind, FieldSpec, FieldValue, Resource};
use crate::api::{de_flag, de_text, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;

/// Inclusive bounds of a tax rate, in percent.
pub const RATE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSetting {
  pub id: RecordId,
  pub code: String,
  #[serde(default, deserialize_with = "de_text")]
  pub rate: String,
  #[serde(default, deserialize_with = "de_flag")]
  pub is_default: bool,
}

const COLUMNS: &[Column] = &[
  Column::new("Code", 20),
  Column::new("Rate %", 10),
  Column::new("Default", 8),
];

impl Resource for TaxSetting {
  type Draft = TaxSettingDraft;

  const COLLECTION: &'static str = "tax-settings";
  const LABEL: &'static str = "Tax Settings";
  const NOUN: &'static str = "tax setting";

  fn id(&self) -> &RecordId {
    &self.id
  }

  fn title(&self) -> &str {
    &self.code
  }

  fn columns() -> &'static [Column] {
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.code.clone(),
      self.rate.clone(),
      if self.is_default { "yes" } else { "" }.to_string(),
    ]
  }
}

/// Rate is held as typed text and only parsed at validation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxSettingDraft {
  pub code: String,
  pub rate: String,
  pub is_default: bool,
}

impl Draft for TaxSettingDraft {
  type Record = TaxSetting;

  fn from_record(record: &TaxSetting) -> Self {
    Self {
      code: record.code.clone(),
      rate: record.rate.clone(),
      is_default: record.is_default,
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    vec![
      FieldSpec::new("code", "Tax code", FieldKind::Text)
        .value(&self.code)
        .required(),
      FieldSpec::new("rate", "Rate (%)", FieldKind::Number)
        .value(&self.rate)
        .required(),
      FieldSpec::new("is_default", "Default", FieldKind::Flag).flag(self.is_default),
    ]
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    match name {
      "code" => self.code = value.into_text(name)?,
      "rate" => self.rate = value.into_text(name)?,
      "is_default" => self.is_default = value.into_flag(name)?,
      _ => return Err(FieldError::unknown(name)),
    }
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    require("code", &self.code, "Tax code is required")?;
    require("rate", &self.rate, "Tax rate is required")?;
    match self.rate.trim().parse::<f64>() {
      Ok(rate) if RATE_RANGE.contains(&rate) => Ok(()),
      _ => Err(FieldError::new(
        "rate",
        "Tax rate must be between 0 and 100",
      )),
    }
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    fields
      .text("code", self.code.trim())
      .text("rate", self.rate.trim())
      .flag("is_default", self.is_default);
    fields
  }
}
