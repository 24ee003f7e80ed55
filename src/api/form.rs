//! Multipart form payloads in the shape the backend expects.
//!
//! Arrays go out as repeated `name[]` or indexed `name[i]` parts, nested
//! records as `name[i][field]`, booleans as `"1"`/`"0"`. Updates and deletes
//! are POSTs carrying a `_method` override part.

use reqwest::multipart::Form;

/// Override field name recognized by the backend.
pub const METHOD_FIELD: &str = "_method";

/// Verb a POST should be treated as server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodOverride {
  Put,
  Delete,
}

impl MethodOverride {
  pub fn as_str(self) -> &'static str {
    match self {
      MethodOverride::Put => "PUT",
      MethodOverride::Delete => "DELETE",
    }
  }
}

/// Ordered text parts of a multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
  parts: Vec<(String, String)>,
}

impl FormFields {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a single text part.
  pub fn text(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
    self.parts.push((name.into(), value.into()));
    self
  }

  /// Append a trimmed text part, skipping it entirely when blank.
  pub fn optional_text(&mut self, name: &str, value: &str) -> &mut Self {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
      self.text(name, trimmed);
    }
    self
  }

  /// Append a boolean as `"1"` or `"0"`.
  pub fn flag(&mut self, name: impl Into<String>, value: bool) -> &mut Self {
    self.text(name, if value { "1" } else { "0" })
  }

  /// Append each value as `name[]`.
  pub fn repeated<I, S>(&mut self, name: &str, values: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    for value in values {
      self.text(format!("{}[]", name), value);
    }
    self
  }

  /// Append each value as `name[index]`.
  pub fn indexed<I, S>(&mut self, name: &str, values: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    for (index, value) in values.into_iter().enumerate() {
      self.text(format!("{}[{}]", name, index), value);
    }
    self
  }

  /// Part name for a field of the `index`-th nested record: `name[index][field]`.
  pub fn nested_name(name: &str, index: usize, field: &str) -> String {
    format!("{}[{}][{}]", name, index, field)
  }

  /// Append the `_method` override part.
  pub fn method_override(&mut self, method: MethodOverride) -> &mut Self {
    self.text(METHOD_FIELD, method.as_str())
  }

  /// The override carried by this body, if any.
  pub fn override_method(&self) -> Option<MethodOverride> {
    match self.get(METHOD_FIELD)? {
      "PUT" => Some(MethodOverride::Put),
      "DELETE" => Some(MethodOverride::Delete),
      _ => None,
    }
  }

  /// First value for a part name.
  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .parts
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }

  /// All values for a part name, in order.
  pub fn get_all(&self, name: &str) -> Vec<&str> {
    self
      .parts
      .iter()
      .filter(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
      .collect()
  }

  pub fn parts(&self) -> &[(String, String)] {
    &self.parts
  }

  pub fn is_empty(&self) -> bool {
    self.parts.is_empty()
  }

  /// Build the reqwest multipart body.
  pub fn into_multipart(self) -> Form {
    self
      .parts
      .into_iter()
      .fold(Form::new(), |form, (name, value)| form.text(name, value))
  }
}
