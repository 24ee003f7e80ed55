//! Concrete CRM resources and the traits that let one generic panel drive them.
//!
//! A [`Resource`] is a record type of a REST collection. Its [`Draft`] is the
//! editable, locally held copy used by form state: it knows how to describe
//! its fields for rendering, accept field edits, validate itself, and encode
//! itself as a multipart body.

mod agency;
mod business;
mod checklist;
mod company_email;
mod document_type;
mod email_template;
mod payment;
mod tag;
mod tax;
mod workflow;

pub use agency::{Agency, AgencyAddress, AgencyDraft, ContactInfo};
pub use business::{InvoiceAddress, InvoiceAddressDraft, RegistrationNumber, RegistrationNumberDraft};
pub use checklist::{ChecklistItem, ChecklistItemDraft, ChecklistStage, ChecklistWorkflow, WorkflowChecklist};
pub use company_email::{CompanyEmail, CompanyEmailDraft};
pub use document_type::{DocumentType, DocumentTypeDraft};
pub use email_template::{EmailTemplate, EmailTemplateDraft};
pub use payment::{ManualPaymentDetail, ManualPaymentDraft, INVOICE_TYPES};
pub use tag::{Tag, TagDraft};
pub use tax::{TaxSetting, TaxSettingDraft};
pub use workflow::{StageDraft, Workflow, WorkflowDraft, WorkflowStage};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::api::{FormFields, RecordId};
use crate::error::FieldError;
use crate::form::FormMode;
use crate::lookup::{Lookup, LookupOption};

/// A record type backed by a REST collection.
pub trait Resource: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
  type Draft: Draft<Record = Self>;

  /// Collection path segment, e.g. `"tags"`.
  const COLLECTION: &'static str;
  /// Plural label for titles, e.g. `"Tags"`.
  const LABEL: &'static str;
  /// Singular noun for messages, e.g. `"tag"`.
  const NOUN: &'static str;

  fn id(&self) -> &RecordId;

  /// Name/title field used for search and confirmations.
  fn title(&self) -> &str;

  /// Path listed by the panel. Override to add a query string.
  fn list_path() -> String {
    format!("/{}", Self::COLLECTION)
  }

  /// Table columns for the list renderer.
  fn columns() -> &'static [Column];

  /// One cell per column.
  fn cells(&self) -> Vec<String>;

  /// Label/value pairs for the detail view.
  fn details(&self) -> Vec<(&'static str, String)> {
    Self::columns()
      .iter()
      .map(|c| c.title)
      .zip(self.cells())
      .collect()
  }
}

/// A resource kept as one settings object at its own path rather than as a
/// collection of records.
pub trait Singleton: Resource {
  /// How a save is sent for the current `record`. `None` when there is
  /// nothing to save against.
  fn save_mode(_record: Option<&Self>) -> Option<FormMode> {
    Some(FormMode::Replace)
  }
}

/// Editable copy of a [`Resource`].
pub trait Draft: Clone + Default + fmt::Debug + Send + Sync + 'static {
  type Record: Resource;

  /// Populate from a live record for edit mode.
  fn from_record(record: &Self::Record) -> Self;

  /// Field descriptors, in display order.
  fn fields(&self) -> Vec<FieldSpec>;

  /// Local mutation of one field by name. No network effect.
  fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError>;

  /// Pre-flight checks. A failure blocks the submission.
  fn validate(&self, mode: &FormMode) -> Result<(), FieldError>;

  /// Multipart body for create or update (without the `_method` part).
  fn encode(&self, mode: &FormMode) -> FormFields;

  /// Append a nested child row (e.g. a workflow stage).
  fn add_child(&mut self) -> Result<(), FieldError> {
    Err(FieldError::new("", "This form has no nested rows"))
  }

  /// Remove the nested child row at `index`.
  fn remove_child(&mut self, _index: usize) -> Result<(), FieldError> {
    Err(FieldError::new("", "This form has no nested rows"))
  }
}

/// Table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
  pub title: &'static str,
  pub width: u16,
}

impl Column {
  pub const fn new(title: &'static str, width: u16) -> Self {
    Self { title, width }
  }
}

/// How a field is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Multiline,
  Number,
  Flag,
  /// One of a fixed set of values; cycling moves to the next option.
  Choice(&'static [&'static str]),
  /// Set of identifiers, edited as comma-separated text.
  Ids,
  /// One id picked by name from a listing.
  Pick(Lookup),
  /// Several ids picked by name from a listing.
  PickMany(Lookup),
}

impl FieldKind {
  /// Listing a picker field draws its names from.
  pub fn lookup(self) -> Option<Lookup> {
    match self {
      FieldKind::Pick(lookup) | FieldKind::PickMany(lookup) => Some(lookup),
      _ => None,
    }
  }
}

/// Rendered description of one draft field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: String,
  pub label: String,
  pub kind: FieldKind,
  pub value: String,
  pub required: bool,
  /// Picker entries, attached once the listing has loaded.
  pub options: Vec<LookupOption>,
}

impl FieldSpec {
  pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
    Self {
      name: name.into(),
      label: label.into(),
      kind,
      value: String::new(),
      required: false,
      options: Vec::new(),
    }
  }

  /// Name of picker option `id`, or `#id` when the listing lacks it.
  pub fn option_label(&self, id: &str) -> String {
    self
      .options
      .iter()
      .find(|o| o.id == id)
      .map(|o| o.label.clone())
      .unwrap_or_else(|| format!("#{}", id))
  }

  /// The value as shown: picker ids become names once options are attached.
  pub fn display_value(&self) -> String {
    if self.options.is_empty() {
      return self.value.clone();
    }
    match self.kind {
      FieldKind::Pick(_) if !self.value.trim().is_empty() => self.option_label(self.value.trim()),
      FieldKind::PickMany(_) => self
        .value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| self.option_label(id))
        .collect::<Vec<_>>()
        .join(", "),
      _ => self.value.clone(),
    }
  }

  pub fn value(mut self, value: impl Into<String>) -> Self {
    self.value = value.into();
    self
  }

  pub fn flag(self, on: bool) -> Self {
    self.value(if on { "yes" } else { "no" })
  }

  pub fn required(mut self) -> Self {
    self.required = true;
    self
  }
}

/// Value handed to [`Draft::set_field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  Text(String),
  Flag(bool),
  Ids(IdSet),
}

impl FieldValue {
  pub fn text(value: impl Into<String>) -> Self {
    FieldValue::Text(value.into())
  }

  pub fn into_text(self, field: &str) -> Result<String, FieldError> {
    match self {
      FieldValue::Text(s) => Ok(s),
      _ => Err(FieldError::new(field, format!("'{}' expects text", field))),
    }
  }

  pub fn into_flag(self, field: &str) -> Result<bool, FieldError> {
    match self {
      FieldValue::Flag(b) => Ok(b),
      FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(FieldError::new(field, format!("'{}' expects yes or no", field))),
      },
      FieldValue::Ids(_) => Err(FieldError::new(field, format!("'{}' expects yes or no", field))),
    }
  }

  /// Accepts an id set directly or comma-separated text.
  pub fn into_ids(self, field: &str) -> Result<IdSet, FieldError> {
    match self {
      FieldValue::Ids(ids) => Ok(ids),
      FieldValue::Text(s) => IdSet::parse(field, &s),
      FieldValue::Flag(_) => Err(FieldError::new(field, format!("'{}' expects a list", field))),
    }
  }

  /// Text restricted to one of `options`.
  pub fn into_choice(self, field: &str, options: &[&str]) -> Result<String, FieldError> {
    let value = self.into_text(field)?;
    if options.contains(&value.as_str()) {
      Ok(value)
    } else {
      Err(FieldError::new(
        field,
        format!("'{}' must be one of: {}", field, options.join(", ")),
      ))
    }
  }
}

/// Unordered set of identifiers, membership-tested by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet(BTreeSet<String>);

impl IdSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse comma-separated ids. Blank entries are rejected.
  pub fn parse(field: &str, text: &str) -> Result<Self, FieldError> {
    let mut set = Self::new();
    if text.trim().is_empty() {
      return Ok(set);
    }
    for part in text.split(',') {
      set.add(field, part)?;
    }
    Ok(set)
  }

  /// Insert an id. Returns whether it was newly added.
  pub fn add(&mut self, field: &str, id: &str) -> Result<bool, FieldError> {
    let id = id.trim();
    if id.is_empty() {
      return Err(FieldError::new(
        field,
        "Please fill in all ids or remove empty entries",
      ));
    }
    Ok(self.0.insert(id.to_string()))
  }

  pub fn remove(&mut self, id: &str) -> bool {
    self.0.remove(id.trim())
  }

  /// Add when absent, remove when present. Returns membership afterwards.
  pub fn toggle(&mut self, field: &str, id: &str) -> Result<bool, FieldError> {
    if self.remove(id) {
      Ok(false)
    } else {
      self.add(field, id)
    }
  }

  pub fn contains(&self, id: &str) -> bool {
    self.0.contains(id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn display(&self) -> String {
    self.iter().collect::<Vec<_>>().join(", ")
  }
}

impl<'a> FromIterator<&'a RecordId> for IdSet {
  fn from_iter<I: IntoIterator<Item = &'a RecordId>>(iter: I) -> Self {
    Self(iter.into_iter().map(|id| id.as_str().to_string()).collect())
  }
}

impl<'a> FromIterator<&'a str> for IdSet {
  fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect(),
    )
  }
}

/// Active/Inactive status carried by several resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Status {
  #[default]
  Active,
  Inactive,
}

impl Status {
  pub fn is_active(self) -> bool {
    self == Status::Active
  }

  pub fn label(self) -> &'static str {
    match self {
      Status::Active => "Active",
      Status::Inactive => "Inactive",
    }
  }
}

impl<'de> Deserialize<'de> for Status {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    // Sent as "Active"/"Inactive", true/false or 1/0 depending on the endpoint
    let raw = serde_json::Value::deserialize(deserializer)?;
    let active = match &raw {
      serde_json::Value::Bool(b) => *b,
      serde_json::Value::Number(n) => n.as_i64() != Some(0),
      serde_json::Value::String(s) => {
        matches!(s.trim().to_ascii_lowercase().as_str(), "active" | "1" | "true")
      }
      _ => true,
    };
    Ok(if active { Status::Active } else { Status::Inactive })
  }
}

/// Non-empty (after trimming) check.
pub(crate) fn require(field: &str, value: &str, message: &str) -> Result<(), FieldError> {
  if value.trim().is_empty() {
    Err(FieldError::new(field, message))
  } else {
    Ok(())
  }
}

/// Display helper for optional dates like `2024-03-05T10:00:00.000000Z`: `Mar 5, 2024`.
pub(crate) fn short_date(raw: &str) -> String {
  chrono::DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.format("%b %-d, %Y").to_string())
    .or_else(|_| {
      chrono::NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d")
        .map(|d| d.format("%b %-d, %Y").to_string())
    })
    .unwrap_or_else(|_| raw.to_string())
}
