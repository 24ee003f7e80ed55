//! Serde types for the backend's response envelope and its loosely typed scalars.
//!
//! The API is inconsistent about scalar encoding: ids arrive as numbers or
//! strings, booleans as `true`, `1` or `"1"`, rates as `10` or `"10.00"`. The
//! helpers here normalize those on the way in so resource types stay plain.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Re-serialize a value through JSON to convert between compatible types.
/// Used to decode cached raw records into typed resources.
pub fn reserialize<T: DeserializeOwned>(value: impl Serialize) -> serde_json::Result<T> {
  serde_json::from_value(serde_json::to_value(value)?)
}

// ============================================================================
// Envelope
// ============================================================================

/// `status` discriminator of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
  Success,
  Error,
}

/// `{status, message?, data?}` wrapper around every payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
  pub status: ResponseStatus,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default = "Option::default")]
  pub data: Option<T>,
}

impl<T> Envelope<T> {
  pub fn success(data: T) -> Self {
    Self {
      status: ResponseStatus::Success,
      message: None,
      data: Some(data),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      status: ResponseStatus::Error,
      message: Some(message.into()),
      data: None,
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  pub fn is_success(&self) -> bool {
    self.status == ResponseStatus::Success
  }
}

// ============================================================================
// Scalars
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
}

impl Scalar {
  fn into_text(self) -> String {
    match self {
      Scalar::Bool(b) => if b { "1" } else { "0" }.to_string(),
      Scalar::Int(n) => n.to_string(),
      Scalar::Float(f) => f.to_string(),
      Scalar::Str(s) => s,
    }
  }

  fn truthy(&self) -> bool {
    match self {
      Scalar::Bool(b) => *b,
      Scalar::Int(n) => *n != 0,
      Scalar::Float(f) => *f != 0.0,
      Scalar::Str(s) => matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "active"
      ),
    }
  }
}

/// Server-assigned record identifier. Opaque, immutable, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RecordId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<u64> for RecordId {
  fn from(n: u64) -> Self {
    Self(n.to_string())
  }
}

impl<'de> Deserialize<'de> for RecordId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Ok(RecordId(Scalar::deserialize(deserializer)?.into_text()))
  }
}

/// Deserialize a boolean sent as `true`/`1`/`"1"`; null or missing is `false`.
pub fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
  Ok(
    Option::<Scalar>::deserialize(deserializer)?
      .map(|s| s.truthy())
      .unwrap_or(false),
  )
}

/// Deserialize a number or string as text; null or missing is empty.
pub fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(
    Option::<Scalar>::deserialize(deserializer)?
      .map(Scalar::into_text)
      .unwrap_or_default(),
  )
}

/// Deserialize a list of ids; null or missing is empty.
pub fn de_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RecordId>, D::Error> {
  Ok(Option::<Vec<RecordId>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[derive(Debug, Deserialize)]
  struct Sample {
    id: RecordId,
    #[serde(default, deserialize_with = "de_flag")]
    flag: bool,
    #[serde(default, deserialize_with = "de_text")]
    rate: String,
    #[serde(default, deserialize_with = "de_ids")]
    users: Vec<RecordId>,
  }

  #[test]
  fn test_record_id_from_number_or_string() {
    let a: Sample = serde_json::from_value(json!({"id": 42})).unwrap();
    let b: Sample = serde_json::from_value(json!({"id": "42"})).unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.id.as_str(), "42");
  }

  #[test]
  fn test_flag_variants() {
    for (raw, expected) in [
      (json!(true), true),
      (json!(1), true),
      (json!("1"), true),
      (json!(0), false),
      (json!("0"), false),
      (json!(null), false),
    ] {
      let s: Sample = serde_json::from_value(json!({"id": 1, "flag": raw})).unwrap();
      assert_eq!(s.flag, expected);
    }
  }

  #[test]
  fn test_text_from_number() {
    let s: Sample = serde_json::from_value(json!({"id": 1, "rate": 12.5})).unwrap();
    assert_eq!(s.rate, "12.5");
    let s: Sample = serde_json::from_value(json!({"id": 1, "rate": "10.00"})).unwrap();
    assert_eq!(s.rate, "10.00");
  }

  #[test]
  fn test_ids_null_is_empty() {
    let s: Sample = serde_json::from_value(json!({"id": 1, "users": null})).unwrap();
    assert!(s.users.is_empty());
    let s: Sample = serde_json::from_value(json!({"id": 1, "users": [3, "4"]})).unwrap();
    assert_eq!(s.users, vec![RecordId::from(3), RecordId::from("4")]);
  }

  #[test]
  fn test_envelope_without_data() {
    let env: Envelope<serde_json::Value> =
      serde_json::from_value(json!({"status": "error", "message": "Tag not found"})).unwrap();
    assert!(!env.is_success());
    assert_eq!(env.message.as_deref(), Some("Tag not found"));
    assert!(env.data.is_none());
  }
}
