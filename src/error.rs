//! Error taxonomy shared by the API client, the query cache and form state.
//!
//! Every variant is recoverable by user action (resubmit, cancel, reload).
//! Errors are `Clone` so a single failed fetch can be handed to every caller
//! that joined the same in-flight request.

use thiserror::Error;

/// A local, pre-flight validation failure attributed to one field.
///
/// Never leaves form state: it blocks the submission before any request is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      message: message.into(),
    }
  }

  /// Error for a field name the draft does not know about.
  pub fn unknown(field: &str) -> Self {
    Self::new(field, format!("Unknown field '{}'", field))
  }
}

/// Failure of a call through the resource client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
  /// Credential missing or rejected. Raised before sending when absent.
  #[error("Authentication required: {0}")]
  Auth(String),

  /// The server answered with `status: "error"`. Message is shown verbatim.
  #[error("{message}")]
  ServerValidation { message: String },

  /// Transport failure, or a response without a readable envelope.
  #[error("Network error: {0}")]
  Network(String),
}

impl ClientError {
  pub fn server(message: impl Into<String>) -> Self {
    Self::ServerValidation {
      message: message.into(),
    }
  }

  /// Whether the caller should route the user back to sign-in.
  pub fn is_auth(&self) -> bool {
    matches!(self, ClientError::Auth(_))
  }
}

impl From<reqwest::Error> for ClientError {
  fn from(e: reqwest::Error) -> Self {
    ClientError::Network(e.to_string())
  }
}

/// Why a form submission did not start or did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
  /// Form is not open.
  #[error("Form is not open")]
  Closed,
  /// A submission for this draft is already in flight.
  #[error("A submission is already in progress")]
  Busy,
  /// Local validation rejected the draft; nothing was sent.
  #[error(transparent)]
  Invalid(#[from] FieldError),
  /// The request was sent and failed; the draft is preserved.
  #[error(transparent)]
  Failed(ClientError),
}
