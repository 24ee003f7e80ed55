//! In-memory stand-in for the CRM backend, used by tests of the cache, form
//! and panel layers. Speaks the same envelope, override and form conventions
//! as the real API and records every call it receives.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::envelope::Envelope;
use super::form::{FormFields, MethodOverride};
use super::transport::{ApiRequest, HttpMethod, Transport};
use crate::error::ClientError;

#[derive(Default)]
struct State {
  collections: HashMap<String, Vec<Value>>,
  fixtures: HashMap<String, Value>,
  actions: HashMap<String, Envelope<Value>>,
  calls: Vec<(HttpMethod, String)>,
  forms: Vec<FormFields>,
  next_id: u64,
  fail_next: Option<ClientError>,
}

pub struct MemoryBackend {
  state: Mutex<State>,
  delay: Duration,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(State {
        next_id: 1,
        ..State::default()
      }),
      delay: Duration::ZERO,
    }
  }

  /// Delay every response, to keep requests in flight.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Seed a collection with records; ids are taken from the records.
  pub fn seed(&self, collection: &str, records: Vec<Value>) {
    let mut state = self.state.lock().unwrap();
    for record in &records {
      if let Some(id) = record["id"].as_u64() {
        state.next_id = state.next_id.max(id + 1);
      }
    }
    state.collections.insert(collection.to_string(), records);
  }

  /// Serve `data` verbatim for GET on an exact path.
  pub fn fixture(&self, path: &str, data: Value) {
    self
      .state
      .lock()
      .unwrap()
      .fixtures
      .insert(path.to_string(), data);
  }

  /// Answer POSTs to an exact path with `envelope`.
  pub fn action(&self, path: &str, envelope: Envelope<Value>) {
    self
      .state
      .lock()
      .unwrap()
      .actions
      .insert(path.to_string(), envelope);
  }

  /// Fail the next request with `error` instead of answering it.
  pub fn fail_next(&self, error: ClientError) {
    self.state.lock().unwrap().fail_next = Some(error);
  }

  /// Number of calls received for method + path.
  pub fn calls(&self, method: HttpMethod, path: &str) -> usize {
    self
      .state
      .lock()
      .unwrap()
      .calls
      .iter()
      .filter(|(m, p)| *m == method && p == path)
      .count()
  }

  pub fn total_calls(&self) -> usize {
    self.state.lock().unwrap().calls.len()
  }

  /// The most recent form body received.
  pub fn last_form(&self) -> Option<FormFields> {
    self.state.lock().unwrap().forms.last().cloned()
  }

  pub fn records(&self, collection: &str) -> Vec<Value> {
    self
      .state
      .lock()
      .unwrap()
      .collections
      .get(collection)
      .cloned()
      .unwrap_or_default()
  }

  fn handle(&self, request: ApiRequest) -> Result<Envelope<Value>, ClientError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push((request.method, request.path.clone()));
    if let Some(form) = &request.form {
      state.forms.push(form.clone());
    }
    if let Some(err) = state.fail_next.take() {
      return Err(err);
    }
    if request.bearer.is_none() && request.path != "/login" {
      return Err(ClientError::Auth("Unauthenticated.".into()));
    }

    let (path, _query) = request
      .path
      .split_once('?')
      .unwrap_or((request.path.as_str(), ""));
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match request.method {
      HttpMethod::Get => {
        if let Some(data) = state.fixtures.get(&request.path) {
          return Ok(Envelope::success(data.clone()));
        }
        match segments.as_slice() {
          [collection] => Ok(Envelope::success(Value::Array(
            state.collections.get(*collection).cloned().unwrap_or_default(),
          ))),
          [collection, id] => match find(&state, collection, id) {
            Some(record) => Ok(Envelope::success(record.clone())),
            None => Ok(Envelope::error("Record not found")),
          },
          _ => Ok(Envelope::error("Unknown route")),
        }
      }
      HttpMethod::Post => {
        if let Some(envelope) = state.actions.get(&request.path) {
          return Ok(envelope.clone());
        }
        let form = request.form.unwrap_or_default();
        match segments.as_slice() {
          [collection] => {
            let id = state.next_id;
            state.next_id += 1;
            let mut record = decode_form(&form);
            record.insert("id".into(), json!(id));
            let record = Value::Object(record);
            state
              .collections
              .entry(collection.to_string())
              .or_default()
              .push(record.clone());
            Ok(Envelope::success(record).with_message("Created successfully"))
          }
          [collection, id] => {
            let records = state.collections.entry(collection.to_string()).or_default();
            let position = records
              .iter()
              .position(|r| id_matches(r, id));
            match (form.override_method(), position) {
              (Some(MethodOverride::Delete), Some(pos)) => {
                records.remove(pos);
                Ok(Envelope::success(Value::Null).with_message("Deleted successfully"))
              }
              (Some(MethodOverride::Put), Some(pos)) => {
                let record = records[pos].as_object_mut().expect("records are objects");
                for (key, value) in decode_form(&form) {
                  record.insert(key, value);
                }
                Ok(Envelope::success(records[pos].clone()).with_message("Updated successfully"))
              }
              (_, None) => Ok(Envelope::error("Record not found")),
              (None, Some(_)) => Ok(Envelope::error("Method not allowed")),
            }
          }
          _ => Ok(Envelope::error("Unknown route")),
        }
      }
    }
  }
}

fn find<'a>(state: &'a State, collection: &str, id: &str) -> Option<&'a Value> {
  state
    .collections
    .get(collection)?
    .iter()
    .find(|r| id_matches(r, id))
}

fn id_matches(record: &Value, id: &str) -> bool {
  match &record["id"] {
    Value::Number(n) => n.to_string() == id,
    Value::String(s) => s == id,
    _ => false,
  }
}

/// Rebuild a JSON object from form parts: `a`, `a[]`, `a[i]`, `a[i][f]`.
fn decode_form(form: &FormFields) -> Map<String, Value> {
  let mut record = Map::new();
  for (name, value) in form.parts() {
    if name == super::form::METHOD_FIELD {
      continue;
    }
    let mut pieces = name.split('[').map(|p| p.trim_end_matches(']'));
    let base = pieces.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = pieces.collect();
    match rest.as_slice() {
      [] => {
        record.insert(base, Value::String(value.clone()));
      }
      [index] => {
        let list = record
          .entry(base)
          .or_insert_with(|| Value::Array(Vec::new()))
          .as_array_mut()
          .expect("array field");
        match index.parse::<usize>() {
          Ok(i) if i < list.len() => list[i] = Value::String(value.clone()),
          _ => list.push(Value::String(value.clone())),
        }
      }
      [index, field, ..] => {
        let list = record
          .entry(base)
          .or_insert_with(|| Value::Array(Vec::new()))
          .as_array_mut()
          .expect("array field");
        let i: usize = index.parse().unwrap_or(list.len());
        while list.len() <= i {
          list.push(Value::Object(Map::new()));
        }
        list[i][*field] = Value::String(value.clone());
      }
    }
  }
  record
}

#[async_trait]
impl Transport for MemoryBackend {
  async fn send(&self, request: ApiRequest) -> Result<Envelope<Value>, ClientError> {
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.handle(request)
  }
}
