//! Reference lists behind picker fields.
//!
//! A picker field stores ids but shows names. The names come from a listing
//! endpoint read through the shared [`QueryCache`], so a document type added
//! in its own panel shows up in the checklist picker on the next read.

use serde::Deserialize;
use std::collections::HashMap;

use crate::api::{de_text, RecordId};
use crate::cache::{QueryCache, QueryKey, Snapshot};
use crate::query::Query;
use crate::resources::{DocumentType, FieldSpec};

/// Listing a picker field draws its options from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
  /// `GET /users`
  Users,
  /// `GET /document-types`, shared with the document types panel
  DocumentTypes,
}

impl Lookup {
  pub fn key(self, cache: &QueryCache) -> QueryKey {
    let session = cache.client().session();
    match self {
      Lookup::Users => QueryKey::users(session),
      Lookup::DocumentTypes => QueryKey::list::<DocumentType>(session),
    }
  }
}

/// One selectable entry: the id sent to the server and the name shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOption {
  pub id: String,
  pub label: String,
}

#[derive(Deserialize)]
struct RawOption {
  id: RecordId,
  #[serde(default, deserialize_with = "de_text")]
  name: String,
  #[serde(default, deserialize_with = "de_text")]
  email: String,
}

impl From<RawOption> for LookupOption {
  fn from(raw: RawOption) -> Self {
    let name = raw.name.trim();
    let email = raw.email.trim();
    let label = match (name.is_empty(), email.is_empty()) {
      (false, false) => format!("{} <{}>", name, email),
      (false, true) => name.to_string(),
      (true, false) => email.to_string(),
      (true, true) => format!("#{}", raw.id),
    };
    Self {
      id: raw.id.to_string(),
      label,
    }
  }
}

pub fn decode_options(snap: &Snapshot) -> Vec<LookupOption> {
  snap
    .decode_as::<RawOption>()
    .into_iter()
    .map(LookupOption::from)
    .collect()
}

/// Picker options for an open form.
#[derive(Default)]
pub struct Lookups {
  queries: HashMap<Lookup, Query<Vec<LookupOption>>>,
}

impl Lookups {
  /// Start loading every listing the picker fields in `fields` draw from.
  pub fn ensure(&mut self, cache: &QueryCache, fields: &[FieldSpec]) {
    for lookup in fields.iter().filter_map(|f| f.kind.lookup()) {
      self.queries.entry(lookup).or_insert_with(|| {
        let mut query = Query::new(cache.clone(), lookup.key(cache), decode_options);
        query.fetch();
        query
      });
    }
  }

  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    for query in self.queries.values_mut() {
      changed |= query.poll();
    }
    changed
  }

  pub fn options(&self, lookup: Lookup) -> &[LookupOption] {
    self
      .queries
      .get(&lookup)
      .and_then(|q| q.data())
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  /// Attach the loaded options to each picker field.
  pub fn resolve(&self, fields: &mut [FieldSpec]) {
    for field in fields.iter_mut() {
      if let Some(lookup) = field.kind.lookup() {
        field.options = self.options(lookup).to_vec();
      }
    }
  }
}
