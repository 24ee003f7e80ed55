use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::credential::{Credential, Session, User};
use super::envelope::{reserialize, Envelope};
use super::form::{FormFields, MethodOverride};
use super::transport::{ApiRequest, Transport};
use crate::error::ClientError;
use crate::resources::Resource;

/// Successful list response.
#[derive(Debug, Clone, Default)]
pub struct Listing {
  pub message: Option<String>,
  pub records: Vec<Value>,
}

/// Successful mutation response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
  pub message: Option<String>,
  pub data: Option<Value>,
}

/// A write the client knows how to send.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
  Create {
    collection: &'static str,
    fields: FormFields,
  },
  Update {
    collection: &'static str,
    id: super::RecordId,
    fields: FormFields,
  },
  Delete {
    collection: &'static str,
    id: super::RecordId,
  },
  /// POST to a non-CRUD endpoint such as `/document-checklists/mark-workflow-as-checklisted`.
  Action { path: String, fields: FormFields },
}

impl Mutation {
  /// Verb for user-facing fallback messages.
  pub fn verb(&self) -> &'static str {
    match self {
      Mutation::Create { .. } => "create",
      Mutation::Update { .. } => "update",
      Mutation::Delete { .. } => "delete",
      Mutation::Action { .. } => "save",
    }
  }
}

/// CRM API client. Holds the session it was constructed with; every call is
/// authorized with that session's credential.
#[derive(Clone)]
pub struct ResourceClient {
  transport: Arc<dyn Transport>,
  session: Arc<Session>,
}

impl ResourceClient {
  pub fn new(transport: Arc<dyn Transport>, session: Session) -> Self {
    Self {
      transport,
      session: Arc::new(session),
    }
  }

  /// Exchange email + password for a session via `POST /login`.
  pub async fn login(
    transport: Arc<dyn Transport>,
    email: &str,
    password: &str,
  ) -> Result<Self, ClientError> {
    let mut form = FormFields::new();
    form.text("email", email).text("password", password);

    let envelope = transport.send(ApiRequest::post("/login", form)).await?;
    let data = into_outcome(envelope)?
      .data
      .ok_or_else(|| ClientError::Auth("Login response carried no token".into()))?;

    let token = data
      .get("access_token")
      .and_then(Value::as_str)
      .ok_or_else(|| ClientError::Auth("Login response carried no token".into()))?;
    let user: Option<User> = data
      .get("user")
      .and_then(|u| serde_json::from_value(u.clone()).ok());

    info!(email, "signed in");
    Ok(Self::new(
      transport,
      Session::new(Credential::new(token), user),
    ))
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  /// Attach the bearer credential, refusing to build the request without one.
  fn authorize(&self, request: ApiRequest) -> Result<ApiRequest, ClientError> {
    match self.session.credential() {
      Some(credential) => Ok(request.with_bearer(credential.clone())),
      None => Err(ClientError::Auth("No access token; sign in first".into())),
    }
  }

  async fn call(&self, request: ApiRequest) -> Result<Outcome, ClientError> {
    let request = self.authorize(request)?;
    let path = request.path.clone();
    let envelope = self.transport.send(request).await.map_err(|e| {
      warn!(%path, error = %e, "api call failed");
      e
    })?;
    into_outcome(envelope)
  }

  /// `GET {path}` expecting a list payload. `path` may carry a query string.
  pub async fn list(&self, path: &str) -> Result<Listing, ClientError> {
    let outcome = self.call(ApiRequest::get(path)).await?;
    let records = match outcome.data {
      Some(Value::Array(records)) => records,
      None | Some(Value::Null) => Vec::new(),
      Some(other) => {
        return Err(ClientError::Network(format!(
          "Expected a list from {}, got {}",
          path,
          kind_of(&other)
        )))
      }
    };
    debug!(path, count = records.len(), "listed");
    Ok(Listing {
      message: outcome.message,
      records,
    })
  }

  /// List a resource collection and decode each record.
  pub async fn list_as<R: Resource>(&self) -> Result<Vec<R>, ClientError> {
    let listing = self.list(&R::list_path()).await?;
    Ok(decode_records(listing.records))
  }

  /// `GET {path}` expecting a single object.
  pub async fn record(&self, path: &str) -> Result<Value, ClientError> {
    match self.call(ApiRequest::get(path)).await?.data {
      Some(Value::Null) | None => Err(ClientError::Network(format!(
        "{} returned no record",
        path
      ))),
      Some(value) => Ok(value),
    }
  }

  /// `GET {path}` for a settings object that may not exist yet.
  pub async fn setting(&self, path: &str) -> Result<Option<Value>, ClientError> {
    match self.call(ApiRequest::get(path)).await?.data {
      Some(Value::Null) | None => Ok(None),
      Some(value) => Ok(Some(value)),
    }
  }

  /// `GET /{collection}/{id}`.
  pub async fn get(&self, collection: &str, id: &super::RecordId) -> Result<Value, ClientError> {
    self.record(&format!("/{}/{}", collection, id)).await
  }

  pub async fn get_as<R: Resource>(&self, id: &super::RecordId) -> Result<R, ClientError> {
    let value = self.get(R::COLLECTION, id).await?;
    reserialize(value).map_err(|e| ClientError::Network(format!("Malformed {}: {}", R::NOUN, e)))
  }

  /// `POST /{collection}`.
  pub async fn create(&self, collection: &str, fields: FormFields) -> Result<Outcome, ClientError> {
    self
      .call(ApiRequest::post(format!("/{}", collection), fields))
      .await
  }

  /// `POST /{collection}/{id}` with `_method=PUT`.
  pub async fn update(
    &self,
    collection: &str,
    id: &super::RecordId,
    mut fields: FormFields,
  ) -> Result<Outcome, ClientError> {
    if fields.override_method() != Some(MethodOverride::Put) {
      fields.method_override(MethodOverride::Put);
    }
    self
      .call(ApiRequest::post(format!("/{}/{}", collection, id), fields))
      .await
  }

  /// `POST /{collection}/{id}` with `_method=DELETE`.
  pub async fn delete(&self, collection: &str, id: &super::RecordId) -> Result<Outcome, ClientError> {
    let mut fields = FormFields::new();
    fields.method_override(MethodOverride::Delete);
    self
      .call(ApiRequest::post(format!("/{}/{}", collection, id), fields))
      .await
  }

  /// `POST {path}` for endpoints outside the CRUD shape.
  pub async fn action(&self, path: &str, fields: FormFields) -> Result<Outcome, ClientError> {
    self.call(ApiRequest::post(path, fields)).await
  }

  /// Send a prepared mutation.
  pub async fn execute(&self, mutation: Mutation) -> Result<Outcome, ClientError> {
    match mutation {
      Mutation::Create { collection, fields } => self.create(collection, fields).await,
      Mutation::Update {
        collection,
        id,
        fields,
      } => self.update(collection, &id, fields).await,
      Mutation::Delete { collection, id } => self.delete(collection, &id).await,
      Mutation::Action { path, fields } => self.action(&path, fields).await,
    }
  }
}

/// Branch on the envelope status; the server's message travels verbatim.
fn into_outcome(envelope: Envelope<Value>) -> Result<Outcome, ClientError> {
  if envelope.is_success() {
    Ok(Outcome {
      message: envelope.message,
      data: envelope.data,
    })
  } else {
    Err(ClientError::server(
      envelope
        .message
        .unwrap_or_else(|| "The server rejected the request".to_string()),
    ))
  }
}

/// Decode raw records, skipping (and logging) any that do not fit `R`.
pub fn decode_records<R: Resource>(records: impl IntoIterator<Item = Value>) -> Vec<R> {
  records
    .into_iter()
    .filter_map(|raw| match reserialize::<R>(raw) {
      Ok(record) => Some(record),
      Err(e) => {
        warn!(resource = R::COLLECTION, error = %e, "skipping malformed record");
        None
      }
    })
    .collect()
}

fn kind_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::memory::MemoryBackend;
  use crate::api::transport::HttpMethod;
  use crate::api::RecordId;
  use crate::resources::Tag;
  use serde_json::json;

  fn client(backend: &Arc<MemoryBackend>) -> ResourceClient {
    ResourceClient::new(backend.clone(), Session::new(Credential::new("tok"), None))
  }

  #[tokio::test]
  async fn test_missing_credential_never_sends() {
    let backend = Arc::new(MemoryBackend::new());
    let client = ResourceClient::new(backend.clone(), Session::anonymous());

    let err = client.list("/tags").await.unwrap_err();

    assert!(err.is_auth());
    assert_eq!(backend.total_calls(), 0);
  }

  #[tokio::test]
  async fn test_list_as_decodes_records() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(
      "tags",
      vec![json!({"id": 1, "name": "VIP"}), json!({"id": 2, "name": "Follow-up"})],
    );

    let tags: Vec<Tag> = client(&backend).list_as().await.unwrap();

    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "VIP");
  }

  #[tokio::test]
  async fn test_get_as_decodes_one_record() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed("tags", vec![json!({"id": 3, "name": "Alumni"})]);

    let tag: Tag = client(&backend).get_as(&RecordId::from(3u64)).await.unwrap();
    assert_eq!(tag.name, "Alumni");

    let missing = client(&backend).get_as::<Tag>(&RecordId::from(9u64)).await;
    assert!(missing.is_err());
  }

  #[tokio::test]
  async fn test_update_adds_put_override() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed("tags", vec![json!({"id": 4, "name": "Old"})]);
    let mut fields = FormFields::new();
    fields.text("name", "New");

    client(&backend)
      .update("tags", &RecordId::from(4), fields)
      .await
      .unwrap();

    let sent = backend.last_form().unwrap();
    assert_eq!(sent.get("_method"), Some("PUT"));
    assert_eq!(backend.calls(HttpMethod::Post, "/tags/4"), 1);
    assert_eq!(backend.records("tags")[0]["name"], "New");
  }

  #[tokio::test]
  async fn test_second_delete_reports_error() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed("tags", vec![json!({"id": 9, "name": "Temp"})]);
    let client = client(&backend);
    let id = RecordId::from(9);

    assert!(client.delete("tags", &id).await.is_ok());
    let err = client.delete("tags", &id).await.unwrap_err();

    assert_eq!(err, ClientError::server("Record not found"));
  }

  #[tokio::test]
  async fn test_error_envelope_without_message_gets_fallback() {
    let backend = Arc::new(MemoryBackend::new());
    backend.action("/workflows", Envelope::<Value> {
      status: crate::api::ResponseStatus::Error,
      message: None,
      data: None,
    });

    let err = client(&backend)
      .create("workflows", FormFields::new())
      .await
      .unwrap_err();

    assert_eq!(err, ClientError::server("The server rejected the request"));
  }

  #[tokio::test]
  async fn test_login_builds_session() {
    let backend = Arc::new(MemoryBackend::new());
    backend.action(
      "/login",
      Envelope::success(json!({
        "access_token": "fresh-token",
        "user": {"id": 3, "name": "Asha", "email": "asha@agency.test"}
      })),
    );

    let client = ResourceClient::login(backend.clone(), "asha@agency.test", "pw")
      .await
      .unwrap();

    assert_eq!(client.session().credential().unwrap().expose(), "fresh-token");
    assert_eq!(client.session().display_name(), "Asha");
    let sent = backend.last_form().unwrap();
    assert_eq!(sent.get("email"), Some("asha@agency.test"));
  }
}
