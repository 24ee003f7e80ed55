//! Cache layer that coalesces reads and refetches after invalidation.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::key::{QueryKey, Shape};
use crate::api::{decode_records, reserialize, ResourceClient};
use crate::error::ClientError;
use crate::resources::Resource;

type FetchResult = Result<Arc<Vec<Value>>, ClientError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  /// Records of the last successful fetch. A record-shaped endpoint stores
  /// its object as the only element.
  pub records: Arc<Vec<Value>>,
  /// Whether any fetch has succeeded yet.
  pub loaded: bool,
  /// Invalidated and not yet refetched.
  pub stale: bool,
  /// A fetch is in flight.
  pub fetching: bool,
  /// Error of the most recent fetch, cleared by the next success.
  pub error: Option<ClientError>,
  /// Bumped each time a fetch lands.
  pub generation: u64,
}

impl Snapshot {
  /// Decode the records as resource `R`, skipping malformed ones.
  pub fn decode<R: Resource>(&self) -> Vec<R> {
    decode_records(self.records.iter().cloned())
  }

  /// Decode the records as any type, skipping malformed ones.
  pub fn decode_as<T: DeserializeOwned>(&self) -> Vec<T> {
    self
      .records
      .iter()
      .filter_map(|raw| reserialize(raw.clone()).ok())
      .collect()
  }

  /// Decode the single object of a record-shaped endpoint.
  pub fn object<T: DeserializeOwned>(&self) -> Option<T> {
    let value = self.records.first()?.clone();
    match reserialize(value) {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(error = %e, "malformed record in cache");
        None
      }
    }
  }
}

#[derive(Default)]
struct Entry {
  records: Option<Arc<Vec<Value>>>,
  stale: bool,
  error: Option<ClientError>,
  generation: u64,
  /// Bumped by every invalidation; a fetch started under an older epoch
  /// never overwrites the entry.
  epoch: u64,
  in_flight: Option<(u64, SharedFetch)>,
  /// Refetch to start once the in-flight fetch lands.
  queued: bool,
}

impl Entry {
  fn snapshot(&self) -> Snapshot {
    Snapshot {
      records: self.records.clone().unwrap_or_default(),
      loaded: self.records.is_some(),
      stale: self.stale,
      fetching: self.in_flight.is_some(),
      error: self.error.clone(),
      generation: self.generation,
    }
  }

  fn is_fresh(&self) -> bool {
    self.records.is_some() && !self.stale
  }
}

/// In-memory query cache for one session.
///
/// Cheap to clone; clones share entries. Entries are never evicted, only
/// dropped all at once by [`QueryCache::clear`].
#[derive(Clone)]
pub struct QueryCache {
  client: ResourceClient,
  entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
}

impl QueryCache {
  pub fn new(client: ResourceClient) -> Self {
    Self {
      client,
      entries: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub fn client(&self) -> &ResourceClient {
    &self.client
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
    // Entries stay consistent even if a holder panicked mid-update
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Serve the entry if fresh, otherwise join or start a fetch and wait for it.
  pub async fn fetch(&self, key: &QueryKey) -> Result<Snapshot, ClientError> {
    let mut pending = {
      let mut entries = self.lock();
      let entry = entries.entry(key.clone()).or_default();
      if entry.is_fresh() {
        return Ok(entry.snapshot());
      }
      match &entry.in_flight {
        Some((_, fetch)) => fetch.clone(),
        None => self.start(key, entry),
      }
    };

    loop {
      let result = pending.await;
      // A superseded fetch hands over to the refetch queued behind it
      let next = {
        let entries = self.lock();
        match entries.get(key) {
          Some(entry) => match &entry.in_flight {
            Some((_, next)) => Err(next.clone()),
            None => Ok(entry.snapshot()),
          },
          None => Ok(Snapshot::default()),
        }
      };
      match next {
        Err(next) => pending = next,
        Ok(snapshot) => return result.map(|_| snapshot),
      }
    }
  }

  /// Mark the entry stale and refetch it in the background.
  ///
  /// Stale records stay readable until the refetch lands. If a fetch is
  /// already in flight its result is discarded and the refetch starts when it
  /// lands, so a key never has two requests out. Keys that were never fetched
  /// are left alone.
  pub fn invalidate(&self, key: &QueryKey) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key) else {
      return;
    };
    entry.stale = true;
    entry.epoch += 1;
    debug!(key = %key, epoch = entry.epoch, "invalidated");
    if entry.in_flight.is_some() {
      entry.queued = true;
    } else {
      self.start(key, entry);
    }
  }

  pub fn snapshot(&self, key: &QueryKey) -> Option<Snapshot> {
    self.lock().get(key).map(Entry::snapshot)
  }

  /// Generation of the entry, 0 if it does not exist.
  pub fn generation(&self, key: &QueryKey) -> u64 {
    self.lock().get(key).map(|e| e.generation).unwrap_or(0)
  }

  /// Drop every entry. Fetches still in flight land nowhere.
  pub fn clear(&self) {
    self.lock().clear();
  }

  /// Spawn a fetch for `key` under the entry's current epoch.
  fn start(&self, key: &QueryKey, entry: &mut Entry) -> SharedFetch {
    let epoch = entry.epoch;
    let cache = self.clone();
    let key = key.clone();

    let fetch = async move {
      let result = match key.shape() {
        Shape::List => cache.client.list(key.endpoint()).await.map(|l| l.records),
        Shape::Record => cache.client.record(key.endpoint()).await.map(|v| vec![v]),
        Shape::Setting => cache
          .client
          .setting(key.endpoint())
          .await
          .map(|v| v.into_iter().collect()),
      }
      .map(Arc::new);
      cache.land(&key, epoch, &result);
      result
    }
    .boxed()
    .shared();

    entry.in_flight = Some((epoch, fetch.clone()));
    // Runs to completion even if every caller stops waiting
    tokio::spawn(fetch.clone());
    fetch
  }

  fn land(&self, key: &QueryKey, epoch: u64, result: &FetchResult) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key) else {
      return;
    };
    if matches!(entry.in_flight, Some((e, _)) if e == epoch) {
      entry.in_flight = None;
    }
    if epoch < entry.epoch {
      debug!(key = %key, epoch, current = entry.epoch, "discarding superseded fetch");
      if std::mem::take(&mut entry.queued) {
        self.start(key, entry);
      }
      return;
    }

    match result {
      Ok(records) => {
        entry.records = Some(Arc::clone(records));
        entry.stale = false;
        entry.error = None;
      }
      Err(e) => {
        warn!(key = %key, error = %e, "fetch failed");
        entry.error = Some(e.clone());
      }
    }
    entry.generation += 1;
  }
}
