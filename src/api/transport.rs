//! Wire layer: one request in, one envelope out.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::credential::Credential;
use super::envelope::Envelope;
use super::form::FormFields;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Post,
}

/// A fully resolved call against the backend.
#[derive(Debug, Clone)]
pub struct ApiRequest {
  pub method: HttpMethod,
  /// Path relative to the API base, starting with `/`. May carry a query string.
  pub path: String,
  pub bearer: Option<Credential>,
  pub form: Option<FormFields>,
}

impl ApiRequest {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method: HttpMethod::Get,
      path: path.into(),
      bearer: None,
      form: None,
    }
  }

  pub fn post(path: impl Into<String>, form: FormFields) -> Self {
    Self {
      method: HttpMethod::Post,
      path: path.into(),
      bearer: None,
      form: Some(form),
    }
  }

  pub fn with_bearer(mut self, credential: Credential) -> Self {
    self.bearer = Some(credential);
    self
  }
}

/// Something that can deliver an [`ApiRequest`] and hand back the envelope.
///
/// Implementations report transport failures and rejected credentials as
/// errors; an envelope with `status: "error"` is a successful delivery and is
/// interpreted by the client.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: ApiRequest) -> Result<Envelope<Value>, ClientError>;
}

/// Laravel validation failures arrive as `{message, errors}` without a status.
#[derive(Deserialize)]
struct BareMessage {
  message: Option<String>,
}

/// Read a response body as an envelope, accepting message-only error bodies.
fn decode_body(body: &[u8]) -> serde_json::Result<Envelope<Value>> {
  match serde_json::from_slice::<Envelope<Value>>(body) {
    Ok(envelope) => Ok(envelope),
    Err(e) => match serde_json::from_slice::<BareMessage>(body) {
      Ok(BareMessage {
        message: Some(message),
      }) => Ok(Envelope::error(message)),
      _ => Err(e),
    },
  }
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
  http: reqwest::Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API url '{}': {}", base_url, e))?;

    let mut builder = reqwest::Client::builder().user_agent(concat!("crmdeck/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// Resolve a relative API path against the base url, keeping any base path prefix.
  fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
    let joined = format!(
      "{}/{}",
      self.base_url.as_str().trim_end_matches('/'),
      path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| ClientError::Network(format!("Invalid url {}: {}", joined, e)))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: ApiRequest) -> Result<Envelope<Value>, ClientError> {
    let url = self.endpoint(&request.path)?;
    debug!(method = ?request.method, path = %request.path, "api request");

    let mut builder = match request.method {
      HttpMethod::Get => self.http.get(url),
      HttpMethod::Post => self.http.post(url),
    };
    builder = builder.header(ACCEPT, "application/json");
    if let Some(credential) = &request.bearer {
      builder = builder.bearer_auth(credential.expose());
    }
    if let Some(form) = request.form {
      builder = builder.multipart(form.into_multipart());
    }

    let response = builder.send().await?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      return Err(ClientError::Auth(format!(
        "Server rejected the credential ({})",
        status
      )));
    }

    let body = response.bytes().await?;
    match decode_body(&body) {
      Ok(envelope) => Ok(envelope),
      Err(e) => {
        warn!(path = %request.path, %status, error = %e, "unreadable response envelope");
        Err(ClientError::Network(format!(
          "HTTP {}: unreadable response",
          status.as_u16()
        )))
      }
    }
  }
}
