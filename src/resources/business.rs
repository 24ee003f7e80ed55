use serde::{Deserialize, Serialize};

use super::{require, Column, Draft, FieldKind, FieldSpec, FieldValue, Resource, Singleton};
use crate::api::{de_text, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;

/// Company registration number shown on invoices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationNumber {
  #[serde(default)]
  pub id: RecordId,
  #[serde(default, deserialize_with = "de_text")]
  pub registration_number: String,
}

const REGISTRATION_COLUMNS: &[Column] = &[Column::new("Registration Number", 30)];

impl Resource for RegistrationNumber {
  type Draft = RegistrationNumberDraft;

  const COLLECTION: &'static str = "business-registration-number";
  const LABEL: &'static str = "Registration Number";
  const NOUN: &'static str = "registration number";

  fn id(&self) -> &RecordId {
    &self.id
  }

  fn title(&self) -> &str {
    &self.registration_number
  }

  fn columns() -> &'static [Column] {
    REGISTRATION_COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![self.registration_number.clone()]
  }
}

impl Singleton for RegistrationNumber {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationNumberDraft {
  pub registration_number: String,
}

impl Draft for RegistrationNumberDraft {
  type Record = RegistrationNumber;

  fn from_record(record: &RegistrationNumber) -> Self {
    Self {
      registration_number: record.registration_number.clone(),
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    vec![
      FieldSpec::new("registration_number", "Registration number", FieldKind::Text)
        .value(&self.registration_number)
        .required(),
    ]
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    match name {
      "registration_number" => self.registration_number = value.into_text(name)?,
      _ => return Err(FieldError::unknown(name)),
    }
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    require(
      "registration_number",
      &self.registration_number,
      "Registration number is required",
    )
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    fields.text("registration_number", self.registration_number.trim());
    fields
  }
}

/// Address printed on outgoing invoices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAddress {
  #[serde(default)]
  pub id: RecordId,
  #[serde(default, deserialize_with = "de_text")]
  pub street: String,
  #[serde(default, deserialize_with = "de_text")]
  pub city: String,
  #[serde(default, deserialize_with = "de_text")]
  pub state: String,
  #[serde(default, deserialize_with = "de_text")]
  pub zip_code: String,
  #[serde(default, deserialize_with = "de_text")]
  pub country: String,
}

const ADDRESS_COLUMNS: &[Column] = &[
  Column::new("Street", 28),
  Column::new("City", 16),
  Column::new("State", 16),
  Column::new("Zip Code", 10),
  Column::new("Country", 16),
];

/// Required address fields with their messages, in form order.
const ADDRESS_FIELDS: &[(&str, &str, &str)] = &[
  ("street", "Street", "Street is required"),
  ("city", "City", "City is required"),
  ("state", "State", "State is required"),
  ("zip_code", "Zip code", "Zip code is required"),
  ("country", "Country", "Country is required"),
];

impl Resource for InvoiceAddress {
  type Draft = InvoiceAddressDraft;

  const COLLECTION: &'static str = "business-invoice-address";
  const LABEL: &'static str = "Invoice Address";
  const NOUN: &'static str = "invoice address";

  fn id(&self) -> &RecordId {
    &self.id
  }

  fn title(&self) -> &str {
    &self.street
  }

  fn columns() -> &'static [Column] {
    ADDRESS_COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.street.clone(),
      self.city.clone(),
      self.state.clone(),
      self.zip_code.clone(),
      self.country.clone(),
    ]
  }
}

impl Singleton for InvoiceAddress {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceAddressDraft {
  pub street: String,
  pub city: String,
  pub state: String,
  pub zip_code: String,
  pub country: String,
}

impl InvoiceAddressDraft {
  fn get(&self, name: &str) -> &str {
    match name {
      "street" => &self.street,
      "city" => &self.city,
      "state" => &self.state,
      "zip_code" => &self.zip_code,
      "country" => &self.country,
      _ => "",
    }
  }
}

impl Draft for InvoiceAddressDraft {
  type Record = InvoiceAddress;

  fn from_record(record: &InvoiceAddress) -> Self {
    Self {
      street: record.street.clone(),
      city: record.city.clone(),
      state: record.state.clone(),
      zip_code: record.zip_code.clone(),
      country: record.country.clone(),
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    ADDRESS_FIELDS
      .iter()
      .map(|&(name, label, _)| {
        FieldSpec::new(name, label, FieldKind::Text)
          .value(self.get(name))
          .required()
      })
      .collect()
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    let slot = match name {
      "street" => &mut self.street,
      "city" => &mut self.city,
      "state" => &mut self.state,
      "zip_code" => &mut self.zip_code,
      "country" => &mut self.country,
      _ => return Err(FieldError::unknown(name)),
    };
    *slot = value.into_text(name)?;
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    for (name, _, message) in ADDRESS_FIELDS {
      require(name, self.get(name), message)?;
    }
    Ok(())
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    for (name, _, _) in ADDRESS_FIELDS {
      fields.text(*name, self.get(name).trim());
    }
    fields
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_registration_number_round_trip() {
    let record: RegistrationNumber =
      serde_json::from_value(json!({"registration_number": "ABN 51 824 753 556"})).unwrap();
    let mut draft = RegistrationNumberDraft::from_record(&record);
    assert_eq!(draft.registration_number, "ABN 51 824 753 556");

    draft
      .set_field("registration_number", FieldValue::text("  "))
      .unwrap();
    let err = draft.validate(&FormMode::Replace).unwrap_err();
    assert_eq!(err.message, "Registration number is required");

    draft
      .set_field("registration_number", FieldValue::text(" 12-345 "))
      .unwrap();
    assert_eq!(
      draft.encode(&FormMode::Replace).get("registration_number"),
      Some("12-345")
    );
  }

  #[test]
  fn test_unset_registration_number_decodes_nulls() {
    let record: RegistrationNumber =
      serde_json::from_value(json!({"id": 4, "registration_number": null})).unwrap();
    assert_eq!(record.registration_number, "");
    assert_eq!(record.id, RecordId::from(4u64));
  }

  #[test]
  fn test_address_requires_every_part_in_order() {
    let mut draft = InvoiceAddressDraft {
      street: "12 Queen St".into(),
      city: "Brisbane".into(),
      ..Default::default()
    };
    assert_eq!(
      draft.validate(&FormMode::Replace).unwrap_err().message,
      "State is required"
    );

    draft.set_field("state", FieldValue::text("QLD")).unwrap();
    assert_eq!(
      draft.validate(&FormMode::Replace).unwrap_err().field,
      "zip_code"
    );

    draft.set_field("zip_code", FieldValue::text(" 4000 ")).unwrap();
    draft.set_field("country", FieldValue::text("Australia")).unwrap();
    assert!(draft.validate(&FormMode::Replace).is_ok());

    let fields = draft.encode(&FormMode::Replace);
    assert_eq!(fields.get("zip_code"), Some("4000"));
    assert_eq!(fields.get("country"), Some("Australia"));
    assert!(draft.set_field("suburb", FieldValue::text("x")).is_err());
  }

  #[test]
  fn test_address_fields_are_all_required() {
    let fields = InvoiceAddressDraft::default().fields();
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["street", "city", "state", "zip_code", "country"]);
    assert!(fields.iter().all(|f| f.required));
  }
}
