//! Cache-backed query handle for views.
//!
//! A `Query<T>` watches one [`QueryKey`] of the shared [`QueryCache`]. Fetches
//! run on the tokio runtime and report back through a channel that the view
//! polls on every tick, so rendering never waits on the network. Dropping the
//! query drops the receiver and any late result with it.
//!
//! # Example
//!
//! ```ignore
//! let key = QueryKey::list::<Tag>(cache.client().session());
//! let mut query = Query::new(cache.clone(), key, |snap| snap.decode::<Tag>());
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(tags) => render_tags(tags),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use tokio::sync::mpsc;

use crate::api::{Mutation, Outcome, ResourceClient};
use crate::cache::{QueryCache, QueryKey, Snapshot};
use crate::error::ClientError;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// First fetch in flight, nothing to show yet
  Loading,
  /// Data available (possibly stale while a refetch runs)
  Success(T),
  /// Fetch failed and there is no data to fall back on
  Error(ClientError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ClientError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type Decoder<T> = Box<dyn Fn(&Snapshot) -> T + Send + Sync>;

pub struct Query<T> {
  state: QueryState<T>,
  cache: QueryCache,
  key: QueryKey,
  decode: Decoder<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<Snapshot, ClientError>>>,
  /// Generation of the snapshot currently decoded into `state`.
  generation: u64,
  refreshing: bool,
  /// Error of the last refetch while older data is still shown.
  refresh_error: Option<ClientError>,
}

impl<T: Send + 'static> Query<T> {
  pub fn new<F>(cache: QueryCache, key: QueryKey, decode: F) -> Self
  where
    F: Fn(&Snapshot) -> T + Send + Sync + 'static,
  {
    Self {
      state: QueryState::Idle,
      cache,
      key,
      decode: Box::new(decode),
      receiver: None,
      generation: 0,
      refreshing: false,
      refresh_error: None,
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Data is shown while a background refetch runs.
  pub fn is_refreshing(&self) -> bool {
    self.refreshing
  }

  pub fn error(&self) -> Option<&ClientError> {
    self.state.error().or(self.refresh_error.as_ref())
  }

  /// Start fetching if not already waiting on a result.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if self.data().is_none() {
      self.state = QueryState::Loading;
    }

    let cache = self.cache.clone();
    let key = self.key.clone();
    tokio::spawn(async move {
      let result = cache.fetch(&key).await;
      // Receiver may have been dropped with its view
      let _ = tx.send(result);
    });
  }

  /// Invalidate the key and wait for the background refetch.
  pub fn refetch(&mut self) {
    self.cache.invalidate(&self.key);
    self.receiver = None;
    self.fetch();
  }

  /// Poll for a pending result, or for a newer cache generation landed by
  /// someone else (e.g. a form invalidating this key).
  ///
  /// Returns `true` if the state changed. Call this in the tick handler.
  pub fn poll(&mut self) -> bool {
    if let Some(receiver) = &mut self.receiver {
      match receiver.try_recv() {
        Ok(Ok(snapshot)) => {
          self.receiver = None;
          self.apply(&snapshot);
          return true;
        }
        Ok(Err(error)) => {
          self.receiver = None;
          self.fail(error);
          return true;
        }
        Err(mpsc::error::TryRecvError::Empty) => {}
        Err(mpsc::error::TryRecvError::Disconnected) => {
          self.receiver = None;
          self.fail(ClientError::Network("Query was cancelled".to_string()));
          return true;
        }
      }
    }

    match self.cache.snapshot(&self.key) {
      Some(snapshot) if snapshot.generation != self.generation => {
        if snapshot.loaded {
          self.apply(&snapshot);
        } else if let Some(error) = snapshot.error.clone() {
          self.generation = snapshot.generation;
          self.fail(error);
        }
        true
      }
      Some(snapshot) if snapshot.fetching != self.refreshing && self.data().is_some() => {
        self.refreshing = snapshot.fetching;
        true
      }
      _ => false,
    }
  }

  fn apply(&mut self, snapshot: &Snapshot) {
    self.generation = snapshot.generation;
    self.refreshing = snapshot.fetching;
    self.refresh_error = snapshot.error.clone();
    self.state = QueryState::Success((self.decode)(snapshot));
  }

  fn fail(&mut self, error: ClientError) {
    if self.data().is_some() {
      self.refreshing = false;
      self.refresh_error = Some(error);
    } else {
      self.state = QueryState::Error(error);
    }
  }
}

/// A write sent in the background, polled on tick like a query.
pub struct MutationTask {
  receiver: mpsc::UnboundedReceiver<Result<Outcome, ClientError>>,
}

impl MutationTask {
  pub fn spawn(client: ResourceClient, mutation: Mutation) -> Self {
    let (tx, receiver) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      let _ = tx.send(client.execute(mutation).await);
    });
    Self { receiver }
  }

  /// The result once it has arrived.
  pub fn poll(&mut self) -> Option<Result<Outcome, ClientError>> {
    match self.receiver.try_recv() {
      Ok(result) => Some(result),
      Err(mpsc::error::TryRecvError::Empty) => None,
      Err(mpsc::error::TryRecvError::Disconnected) => Some(Err(ClientError::Network(
        "Request was cancelled".to_string(),
      ))),
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("generation", &self.generation)
      .finish_non_exhaustive()
  }
}
