//! Bearer credential and the session passed explicitly to every client.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque bearer token obtained by login or supplied by the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }

  /// Raw token for the `Authorization` header. Never log this.
  pub fn expose(&self) -> &str {
    &self.0
  }

  /// Stable, non-reversible digest of the token for use in cache keys.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.0.as_bytes());
    // 16 hex chars is plenty to tell sessions apart
    hex::encode(hasher.finalize())[..16].to_string()
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Credential({}…)", self.fingerprint())
  }
}

/// The signed-in user as returned by `/login`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
  #[serde(default, deserialize_with = "super::envelope::de_text")]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
}

/// Credential plus user, handed down through constructors.
#[derive(Debug, Clone, Default)]
pub struct Session {
  credential: Option<Credential>,
  user: Option<User>,
}

impl Session {
  pub fn new(credential: Credential, user: Option<User>) -> Self {
    Self {
      credential: Some(credential),
      user,
    }
  }

  /// A session with no credential. Every call through it fails with `Auth`.
  pub fn anonymous() -> Self {
    Self::default()
  }

  pub fn credential(&self) -> Option<&Credential> {
    self.credential.as_ref()
  }

  pub fn user(&self) -> Option<&User> {
    self.user.as_ref()
  }

  /// Fingerprint used to scope cache keys; anonymous sessions share one scope.
  pub fn scope(&self) -> String {
    self
      .credential
      .as_ref()
      .map(Credential::fingerprint)
      .unwrap_or_else(|| "anonymous".to_string())
  }

  /// Display name for the header.
  pub fn display_name(&self) -> &str {
    self
      .user
      .as_ref()
      .map(|u| if u.name.is_empty() { u.email.as_str() } else { u.name.as_str() })
      .unwrap_or("")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_debug_does_not_leak_token() {
    let cred = Credential::new("super-secret-token");
    let debug = format!("{:?}", cred);
    assert!(!debug.contains("super-secret-token"));
  }

  #[test]
  fn test_fingerprint_is_stable_and_distinct() {
    let a = Credential::new("a");
    assert_eq!(a.fingerprint(), Credential::new("a").fingerprint());
    assert_ne!(a.fingerprint(), Credential::new("b").fingerprint());
    assert_eq!(a.fingerprint().len(), 16);
  }

  #[test]
  fn test_anonymous_scope() {
    let session = Session::anonymous();
    assert!(session.credential().is_none());
    assert_eq!(session.scope(), "anonymous");
  }
}
