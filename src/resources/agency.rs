use serde::{Deserialize, Serialize};

use super::{require, Column, Draft, FieldKind, FieldSpec, FieldValue, Resource, Singleton};
use crate::api::{de_text, FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
  #[serde(default, deserialize_with = "de_text")]
  pub email: String,
  #[serde(default, deserialize_with = "de_text")]
  pub phone: String,
  #[serde(default, deserialize_with = "de_text")]
  pub fax: String,
  #[serde(default, deserialize_with = "de_text")]
  pub website: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgencyAddress {
  #[serde(default, deserialize_with = "de_text")]
  pub street: String,
  #[serde(default, deserialize_with = "de_text")]
  pub city: String,
  #[serde(default, deserialize_with = "de_text")]
  pub state: String,
  #[serde(default, deserialize_with = "de_text")]
  pub zip: String,
  #[serde(default, deserialize_with = "de_text")]
  pub country: String,
}

/// The signed-in user's agency profile. Contact details and address arrive
/// nested but are saved flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
  pub id: RecordId,
  #[serde(default, deserialize_with = "de_text")]
  pub company_name: String,
  #[serde(default)]
  pub contact_info: Option<ContactInfo>,
  #[serde(default)]
  pub address: Option<AgencyAddress>,
  #[serde(default)]
  pub logo_url: Option<String>,
}

const COLUMNS: &[Column] = &[
  Column::new("Company", 28),
  Column::new("Email", 28),
  Column::new("Phone", 16),
];

impl Agency {
  fn contact(&self) -> ContactInfo {
    self.contact_info.clone().unwrap_or_default()
  }

  fn location(&self) -> AgencyAddress {
    self.address.clone().unwrap_or_default()
  }
}

impl Resource for Agency {
  type Draft = AgencyDraft;

  const COLLECTION: &'static str = "agency";
  const LABEL: &'static str = "Agency";
  const NOUN: &'static str = "agency";

  fn id(&self) -> &RecordId {
    &self.id
  }

  fn title(&self) -> &str {
    &self.company_name
  }

  fn columns() -> &'static [Column] {
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    let contact = self.contact();
    vec![self.company_name.clone(), contact.email, contact.phone]
  }

  fn details(&self) -> Vec<(&'static str, String)> {
    let contact = self.contact();
    let address = self.location();
    let mut details = vec![
      ("Company", self.company_name.clone()),
      ("Email", contact.email),
      ("Phone", contact.phone),
      ("Fax", contact.fax),
      ("Website", contact.website),
      (
        "Address",
        [address.street, address.city, address.state, address.zip, address.country]
          .into_iter()
          .filter(|part| !part.trim().is_empty())
          .collect::<Vec<_>>()
          .join(", "),
      ),
    ];
    if let Some(logo) = self.logo_url.as_ref().filter(|l| !l.is_empty()) {
      details.push(("Logo", logo.clone()));
    }
    details
  }
}

impl Singleton for Agency {
  /// Saved against its own id with a PUT override.
  fn save_mode(record: Option<&Self>) -> Option<FormMode> {
    record.map(|r| FormMode::Edit(r.id.clone()))
  }
}

/// (name, label, required message). `None` marks an optional field.
const FIELDS: &[(&str, &str, Option<&str>)] = &[
  ("company_name", "Company name", Some("Company name is required")),
  ("email", "Email", Some("Email is required")),
  ("phone", "Phone", Some("Phone is required")),
  ("fax", "Fax", None),
  ("website", "Website", None),
  ("street", "Street", Some("Street is required")),
  ("city", "City", Some("City is required")),
  ("state", "State", Some("State is required")),
  ("zip", "Zip", Some("Zip is required")),
  ("country", "Country", Some("Country is required")),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgencyDraft {
  pub company_name: String,
  pub email: String,
  pub phone: String,
  pub fax: String,
  pub website: String,
  pub street: String,
  pub city: String,
  pub state: String,
  pub zip: String,
  pub country: String,
}

impl AgencyDraft {
  fn slot(&mut self, name: &str) -> Option<&mut String> {
    Some(match name {
      "company_name" => &mut self.company_name,
      "email" => &mut self.email,
      "phone" => &mut self.phone,
      "fax" => &mut self.fax,
      "website" => &mut self.website,
      "street" => &mut self.street,
      "city" => &mut self.city,
      "state" => &mut self.state,
      "zip" => &mut self.zip,
      "country" => &mut self.country,
      _ => return None,
    })
  }

  fn get(&self, name: &str) -> &str {
    match name {
      "company_name" => &self.company_name,
      "email" => &self.email,
      "phone" => &self.phone,
      "fax" => &self.fax,
      "website" => &self.website,
      "street" => &self.street,
      "city" => &self.city,
      "state" => &self.state,
      "zip" => &self.zip,
      "country" => &self.country,
      _ => "",
    }
  }
}

impl Draft for AgencyDraft {
  type Record = Agency;

  fn from_record(record: &Agency) -> Self {
    let contact = record.contact();
    let address = record.location();
    Self {
      company_name: record.company_name.clone(),
      email: contact.email,
      phone: contact.phone,
      fax: contact.fax,
      website: contact.website,
      street: address.street,
      city: address.city,
      state: address.state,
      zip: address.zip,
      country: address.country,
    }
  }

  fn fields(&self) -> Vec<FieldSpec> {
    FIELDS
      .iter()
      .map(|&(name, label, message)| {
        let spec = FieldSpec::new(name, label, FieldKind::Text).value(self.get(name));
        if message.is_some() {
          spec.required()
        } else {
          spec
        }
      })
      .collect()
  }

  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
    let text = value.into_text(name)?;
    match self.slot(name) {
      Some(slot) => *slot = text,
      None => return Err(FieldError::unknown(name)),
    }
    Ok(())
  }

  fn validate(&self, _mode: &FormMode) -> Result<(), FieldError> {
    for &(name, _, message) in FIELDS {
      if let Some(message) = message {
        require(name, self.get(name), message)?;
      }
    }
    Ok(())
  }

  fn encode(&self, _mode: &FormMode) -> FormFields {
    let mut fields = FormFields::new();
    for &(name, _, _) in FIELDS {
      fields.text(name, self.get(name).trim());
    }
    fields
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn agency() -> Agency {
    serde_json::from_value(json!({
      "id": 9,
      "company_name": "Northstar Education",
      "contact_info": {"email": "hello@northstar.test", "phone": "+61 7 5555 0100", "fax": null, "website": "northstar.test"},
      "address": {"street": "12 Queen St", "city": "Brisbane", "state": "QLD", "zip": 4000, "country": "Australia"},
      "logo_url": "https://cdn.northstar.test/logo.png"
    }))
    .unwrap()
  }

  #[test]
  fn test_nested_shape_flattens_into_draft() {
    let draft = AgencyDraft::from_record(&agency());
    assert_eq!(draft.email, "hello@northstar.test");
    assert_eq!(draft.fax, "");
    assert_eq!(draft.zip, "4000");
    assert_eq!(draft.country, "Australia");
  }

  #[test]
  fn test_saves_against_own_id() {
    assert_eq!(
      Agency::save_mode(Some(&agency())),
      Some(FormMode::Edit(RecordId::from(9u64)))
    );
    assert_eq!(Agency::save_mode(None), None);
  }

  #[test]
  fn test_validation_skips_optional_contact_fields() {
    let mut draft = AgencyDraft::from_record(&agency());
    draft.set_field("website", FieldValue::text("")).unwrap();
    assert!(draft.validate(&FormMode::Edit(RecordId::from(9u64))).is_ok());

    draft.set_field("phone", FieldValue::text(" ")).unwrap();
    let err = draft.validate(&FormMode::Edit(RecordId::from(9u64))).unwrap_err();
    assert_eq!(err.field, "phone");
    assert_eq!(err.message, "Phone is required");
  }

  #[test]
  fn test_encode_is_flat_and_has_no_logo() {
    let fields = AgencyDraft::from_record(&agency()).encode(&FormMode::Edit(RecordId::from(9u64)));
    assert_eq!(fields.get("company_name"), Some("Northstar Education"));
    assert_eq!(fields.get("street"), Some("12 Queen St"));
    assert_eq!(fields.get("fax"), Some(""));
    assert_eq!(fields.get("logo"), None);
  }

  #[test]
  fn test_details_join_address() {
    let details = agency().details();
    assert!(details.contains(&("Address", "12 Queen St, Brisbane, QLD, 4000, Australia".to_string())));
  }
}
