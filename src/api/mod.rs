//! Resource client for the CRM REST API.
//!
//! Collections live at `/{resource}` and `/{resource}/{id}`. Reads are GETs;
//! every write is a multipart POST, with a `_method` override part standing in
//! for PUT and DELETE. All responses share one `{status, message, data}`
//! envelope.

mod client;
mod credential;
mod envelope;
mod form;
#[cfg(test)]
pub mod memory;
mod transport;

pub use client::{decode_records, Listing, Mutation, Outcome, ResourceClient};
pub use credential::{Credential, Session, User};
pub use envelope::{de_flag, de_ids, de_text, reserialize, Envelope, RecordId, ResponseStatus};
pub use form::{FormFields, MethodOverride};
#[cfg(test)]
pub use memory::MemoryBackend;
pub use transport::{ApiRequest, HttpMethod, HttpTransport, Transport};
