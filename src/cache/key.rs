//! Typed query keys.

use std::fmt;

use crate::api::{RecordId, Session};
use crate::resources::Resource;

/// Response shape expected at a key's endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
  /// `data` is an array of records.
  List,
  /// `data` is a single object.
  Record,
  /// `data` is a single object, or null while nothing has been saved.
  Setting,
}

/// Document checklist endpoints outside the plain collection shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChecklistPath {
  /// Workflows that already have a checklist.
  Checklisted,
  /// Workflows that can still be given one.
  Available,
  /// Stages and items of one workflow's checklist.
  Detail(RecordId),
}

/// Endpoint path plus the fingerprint of the credential used to read it.
///
/// Only built through the typed constructors so two call sites reading the
/// same endpoint always agree on the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  path: String,
  scope: String,
  shape: Shape,
}

impl QueryKey {
  /// Key of a resource's list endpoint.
  pub fn list<R: Resource>(session: &Session) -> Self {
    Self {
      path: R::list_path(),
      scope: session.scope(),
      shape: Shape::List,
    }
  }

  /// Key of a single record of a resource.
  pub fn detail<R: Resource>(id: &RecordId, session: &Session) -> Self {
    Self {
      path: format!("/{}/{}", R::COLLECTION, id),
      scope: session.scope(),
      shape: Shape::Record,
    }
  }

  /// Key of the user directory behind the shared-users picker.
  pub fn users(session: &Session) -> Self {
    Self {
      path: "/users".to_string(),
      scope: session.scope(),
      shape: Shape::List,
    }
  }

  /// Key of a single settings record read from the resource's own path.
  pub fn setting<R: Resource>(session: &Session) -> Self {
    Self {
      path: R::list_path(),
      scope: session.scope(),
      shape: Shape::Setting,
    }
  }

  pub fn path(path: ChecklistPath, session: &Session) -> Self {
    let (path, shape) = match path {
      ChecklistPath::Checklisted => (
        "/document-checklists?checklist_available=0".to_string(),
        Shape::List,
      ),
      ChecklistPath::Available => (
        "/document-checklists?checklist_available=1".to_string(),
        Shape::List,
      ),
      ChecklistPath::Detail(id) => (format!("/document-checklists/{}", id), Shape::Record),
    };
    Self {
      path,
      scope: session.scope(),
      shape,
    }
  }

  /// Endpoint path, including any query string.
  pub fn endpoint(&self) -> &str {
    &self.path
  }

  pub fn scope(&self) -> &str {
    &self.scope
  }

  pub fn shape(&self) -> Shape {
    self.shape
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} [{}]", self.path, self.scope)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Credential;
  use crate::resources::{EmailTemplate, Tag};

  fn session(token: &str) -> Session {
    Session::new(Credential::new(token), None)
  }

  #[test]
  fn test_same_endpoint_same_key() {
    let s = session("abc");
    assert_eq!(QueryKey::list::<Tag>(&s), QueryKey::list::<Tag>(&s));
    assert_eq!(QueryKey::list::<Tag>(&s).endpoint(), "/tags");
  }

  #[test]
  fn test_scope_separates_sessions() {
    let a = QueryKey::list::<Tag>(&session("abc"));
    let b = QueryKey::list::<Tag>(&session("xyz"));
    assert_ne!(a, b);
  }

  #[test]
  fn test_list_key_keeps_query_string() {
    let key = QueryKey::list::<EmailTemplate>(&session("abc"));
    assert_eq!(key.endpoint(), "/email-templates?type=email");
  }

  #[test]
  fn test_checklist_paths() {
    let s = session("abc");
    let detail = QueryKey::path(ChecklistPath::Detail(RecordId::from(9u64)), &s);
    assert_eq!(detail.endpoint(), "/document-checklists/9");
    assert_eq!(detail.shape(), Shape::Record);
    assert_eq!(
      QueryKey::path(ChecklistPath::Available, &s).endpoint(),
      "/document-checklists?checklist_available=1"
    );
  }

  #[test]
  fn test_detail_key() {
    let key = QueryKey::detail::<Tag>(&RecordId::from("12"), &Session::anonymous());
    assert_eq!(key.endpoint(), "/tags/12");
    assert_eq!(key.scope(), "anonymous");
  }
}
