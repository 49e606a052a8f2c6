//! The shared fetch cache.
//!
//! A [`Store`] maps [`FetchIdentity`] to [`CacheEntry`] and broadcasts a
//! [`StoreChange`] for every commit. It is the single shared surface between
//! dispatches and consumers: dispatchers write entries through the commit
//! operations, consumers read them through selectors and watch them through
//! subscriptions.
//!
//! # Write Discipline
//!
//! All mutation funnels through [`Entries::set`], and the commit operations
//! that call it are crate-internal. Consumers cannot write to the cache
//! directly; the only ways data enters are a fetch's own settled response and
//! merge rule output. This is what makes entry snapshots trustworthy: a
//! `Normal` status always describes data that came from a commit.
//!
//! # Concurrency
//!
//! Entries live behind a single async `RwLock`. Commits take the write lock
//! for the entry write plus any merge propagation, so a settled response and
//! its cross-namespace consequences become visible atomically; readers never
//! observe the gap between them. Notifications are published after the lock
//! is released.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = Arc::new(Store::new());
//! let dispatcher = Dispatcher::builder(transport)
//!     .store(Arc::clone(&store))
//!     .factory(&note_list)
//!     .build();
//!
//! let list = note_list.make(FetchKey::root());
//! let mut sub = store.watch(&list);
//! dispatcher.dispatch(&list).await?;
//! while let Ok(change) = sub.changed().await {
//!     println!("{} is now {}", change.identity, change.status);
//! }
//! ```

use crate::error::StoreError;
use crate::merge::MergeEngine;
use crate::metrics::{MergeMetrics, StoreMetrics};
use refetch_core::{CacheEntry, FetchDescriptor, FetchIdentity, Namespace, Status, TransportError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};

/// Default capacity of the change broadcast channel.
///
/// Merge propagation can fan one commit out into several notifications, so
/// this is sized above the usual action-channel default. Use
/// [`Store::with_capacity`] if observers still lag.
const DEFAULT_CHANGE_CAPACITY: usize = 64;

/// A committed change to one cache entry.
///
/// Published on the store's broadcast channel after every commit: loading
/// transitions, settled responses, and merge writes all produce one change
/// each, in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// The identity whose entry changed.
    pub identity: FetchIdentity,
    /// The entry's status after the change.
    pub status: Status,
}

/// The identity-to-entry map, shared with the merge engine.
///
/// Wrapping the raw `HashMap` keeps the mutation surface explicit: the merge
/// engine rewrites entries during propagation but goes through the same
/// [`Entries::set`] as the store's own commits.
pub(crate) struct Entries {
    map: HashMap<FetchIdentity, CacheEntry>,
}

impl Entries {
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, identity: &FetchIdentity) -> Option<&CacheEntry> {
        self.map.get(identity)
    }

    pub(crate) fn set(&mut self, identity: FetchIdentity, entry: CacheEntry) {
        self.map.insert(identity, entry);
    }

    /// All identities currently cached in `namespace`.
    ///
    /// Collected into an owned `Vec` so callers can mutate the map while
    /// iterating the result.
    pub(crate) fn identities_in(&self, namespace: Namespace) -> Vec<FetchIdentity> {
        self.map
            .keys()
            .filter(|identity| identity.namespace() == namespace)
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

/// The shared fetch cache: entries plus a change broadcast.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Store {
    entries: RwLock<Entries>,
    changes: broadcast::Sender<StoreChange>,
}

impl Store {
    /// Create a store with the default change channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Create a store with a custom change channel capacity.
    ///
    /// Capacity bounds how many unconsumed notifications a slow subscriber
    /// can fall behind before it observes a lag and skips ahead.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            entries: RwLock::new(Entries::new()),
            changes,
        }
    }

    /// Number of identities currently cached.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // ==================== Selectors ====================

    /// Snapshot the entry for an identity.
    ///
    /// Identities nothing has been dispatched for read as
    /// [`CacheEntry::uninitiated`]; selectors never fail on absence.
    pub async fn get(&self, identity: &FetchIdentity) -> CacheEntry {
        self.entries
            .read()
            .await
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot the entry a descriptor reads.
    pub async fn entry(&self, fetch: &FetchDescriptor) -> CacheEntry {
        self.get(fetch.identity()).await
    }

    /// Current status of a fetch.
    pub async fn status(&self, fetch: &FetchDescriptor) -> Status {
        self.entries
            .read()
            .await
            .get(fetch.identity())
            .map_or(Status::Uninitiated, |entry| entry.status)
    }

    /// Current data of a fetch, if any.
    pub async fn data(&self, fetch: &FetchDescriptor) -> Option<Value> {
        self.entries
            .read()
            .await
            .get(fetch.identity())
            .and_then(|entry| entry.data.clone())
    }

    /// Current data of a fetch, deserialized into `T`.
    ///
    /// `Ok(None)` means no data is cached; `Err` means data is cached but
    /// does not deserialize into `T`, which is a programming error at the
    /// call site rather than a fetch failure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Deserialize`] when the cached JSON does not
    /// match `T`.
    pub async fn data_as<T>(&self, fetch: &FetchDescriptor) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        match self.data(fetch).await {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Deserialize {
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Error from the fetch's most recent settled request, if it failed.
    pub async fn error(&self, fetch: &FetchDescriptor) -> Option<TransportError> {
        self.entries
            .read()
            .await
            .get(fetch.identity())
            .and_then(|entry| entry.error.clone())
    }

    /// Run a closure against the fetch's data, if any data is present.
    ///
    /// The conditional-render helper: `None` while nothing is cached (first
    /// load, error), `Some` with the closure's result once data exists,
    /// including while it is refreshing. The closure runs under the read
    /// lock, so it should stay small.
    ///
    /// ```rust,ignore
    /// let title = store.guard(&note, |data| data["content"].to_string()).await;
    /// ```
    pub async fn guard<R>(&self, fetch: &FetchDescriptor, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let entries = self.entries.read().await;
        entries
            .get(fetch.identity())
            .and_then(|entry| entry.data.as_ref())
            .map(f)
    }

    // ==================== Subscriptions ====================

    /// Subscribe to every change the store commits.
    ///
    /// Returns a raw broadcast receiver; most consumers want the filtered
    /// [`Store::watch`] instead. If the receiver lags it will skip old
    /// changes and observe `RecvError::Lagged`.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Watch one fetch's entry for changes.
    ///
    /// Subscribe before dispatching to observe the full loading transition.
    #[must_use]
    pub fn watch(&self, fetch: &FetchDescriptor) -> Subscription {
        Subscription {
            identity: fetch.identity().clone(),
            rx: self.changes.subscribe(),
        }
    }

    // ==================== Commits (dispatch pipeline only) ====================

    /// Commit the loading transition for a dispatched fetch.
    ///
    /// Entries with visible data move to `Refreshing`, everything else to
    /// `Loading`; a stale error is cleared. Returns the committed status.
    pub(crate) async fn begin_load(&self, identity: &FetchIdentity) -> Status {
        let (change, entry_count) = {
            let mut entries = self.entries.write().await;
            let next = entries
                .get(identity)
                .map_or_else(|| CacheEntry::uninitiated().begin_load(), CacheEntry::begin_load);
            let status = next.status;
            entries.set(identity.clone(), next);
            (
                StoreChange {
                    identity: identity.clone(),
                    status,
                },
                entries.len(),
            )
        };
        StoreMetrics::record_entries(entry_count);
        let status = change.status;
        self.notify(change);
        status
    }

    /// Commit a settled response and propagate it through the merge engine.
    ///
    /// The entry write and all merge writes happen under one write lock, so
    /// readers observe the response and its cross-namespace consequences
    /// together. Notifications follow after the lock is released: the
    /// dispatching identity first, then merge targets in propagation order.
    ///
    /// Returns the number of entries rewritten by merge rules.
    pub(crate) async fn commit_success(
        &self,
        identity: &FetchIdentity,
        value: Value,
        merges: &MergeEngine,
    ) -> usize {
        let (own, propagation, entry_count) = {
            let mut entries = self.entries.write().await;
            entries.set(identity.clone(), CacheEntry::succeed(value.clone()));
            let propagation = merges.propagate(&mut entries, identity.namespace(), &value);
            (
                StoreChange {
                    identity: identity.clone(),
                    status: Status::Normal,
                },
                propagation,
                entries.len(),
            )
        };
        StoreMetrics::record_entries(entry_count);
        MergeMetrics::record_propagation(propagation.changes.len(), propagation.skips);

        let merged = propagation.changes.len();
        self.notify(own);
        for change in propagation.changes {
            self.notify(change);
        }
        merged
    }

    /// Commit a settled failure.
    ///
    /// The error replaces any previous data; failures do not propagate to
    /// merge targets.
    pub(crate) async fn commit_failure(&self, identity: &FetchIdentity, error: TransportError) {
        let change = {
            let mut entries = self.entries.write().await;
            entries.set(identity.clone(), CacheEntry::fail(error));
            StoreChange {
                identity: identity.clone(),
                status: Status::Error,
            }
        };
        self.notify(change);
    }

    fn notify(&self, change: StoreChange) {
        tracing::trace!(identity = %change.identity, status = %change.status, "publishing change");
        StoreMetrics::record_notification();
        // Send fails only when no subscriber exists; that is not an error
        let _ = self.changes.send(change);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// A filtered view of the change broadcast for one identity.
///
/// Produced by [`Store::watch`]. Changes for other identities are skipped
/// silently.
pub struct Subscription {
    identity: FetchIdentity,
    rx: broadcast::Receiver<StoreChange>,
}

impl Subscription {
    /// The identity this subscription watches.
    #[must_use]
    pub const fn identity(&self) -> &FetchIdentity {
        &self.identity
    }

    /// Wait for the next change to the watched identity.
    ///
    /// If the subscriber lags behind the broadcast it skips ahead and keeps
    /// waiting, so intermediate statuses can be missed but the final state of
    /// a burst is always observed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] when the store has been dropped.
    pub async fn changed(&mut self) -> Result<StoreChange, StoreError> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.identity == self.identity => return Ok(change),
                Ok(_) => {} // Different identity, keep waiting
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change observer lagged, notifications skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refetch_core::{FetchFactory, RequestSpec};
    use serde::Deserialize;
    use serde_json::json;

    const ITEM: Namespace = Namespace::new("item");

    fn item_fetch(id: &str) -> FetchDescriptor {
        FetchFactory::new("Get Item", ITEM, |key, _| RequestSpec::get(format!("/items/{key}")))
            .make(id)
    }

    #[tokio::test]
    async fn absent_identities_read_as_uninitiated() {
        let store = Store::new();
        let fetch = item_fetch("1");

        assert_eq!(store.status(&fetch).await, Status::Uninitiated);
        assert_eq!(store.data(&fetch).await, None);
        assert_eq!(store.error(&fetch).await, None);
        assert_eq!(store.entry(&fetch).await, CacheEntry::uninitiated());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn begin_load_creates_a_loading_entry() {
        let store = Store::new();
        let fetch = item_fetch("1");

        let status = store.begin_load(fetch.identity()).await;
        assert_eq!(status, Status::Loading);
        assert_eq!(store.status(&fetch).await, Status::Loading);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn begin_load_over_settled_data_refreshes() {
        let store = Store::new();
        let fetch = item_fetch("1");
        let merges = MergeEngine::new();

        store
            .commit_success(fetch.identity(), json!({ "id": "1" }), &merges)
            .await;
        let status = store.begin_load(fetch.identity()).await;

        assert_eq!(status, Status::Refreshing);
        // Data stays visible through the refresh.
        assert_eq!(store.data(&fetch).await, Some(json!({ "id": "1" })));
    }

    #[tokio::test]
    async fn begin_load_clears_a_previous_error() {
        let store = Store::new();
        let fetch = item_fetch("1");

        store
            .commit_failure(fetch.identity(), TransportError::failed("boom"))
            .await;
        assert_eq!(store.status(&fetch).await, Status::Error);

        store.begin_load(fetch.identity()).await;
        assert_eq!(store.status(&fetch).await, Status::Loading);
        assert_eq!(store.error(&fetch).await, None);
    }

    #[tokio::test]
    async fn commit_failure_replaces_data_with_error() {
        let store = Store::new();
        let fetch = item_fetch("1");
        let merges = MergeEngine::new();

        store
            .commit_success(fetch.identity(), json!({ "id": "1" }), &merges)
            .await;
        store
            .commit_failure(fetch.identity(), TransportError::not_found("/items/1"))
            .await;

        let entry = store.entry(&fetch).await;
        assert_eq!(entry.status, Status::Error);
        assert_eq!(entry.data, None);
        assert_eq!(entry.error, Some(TransportError::not_found("/items/1")));
    }

    #[tokio::test]
    async fn guard_runs_only_when_data_exists() {
        let store = Store::new();
        let fetch = item_fetch("1");
        let merges = MergeEngine::new();

        assert_eq!(store.guard(&fetch, |_| "rendered").await, None);

        store
            .commit_success(fetch.identity(), json!({ "id": "1", "n": 7 }), &merges)
            .await;
        let seen = store.guard(&fetch, |data| data["n"].as_i64()).await;
        assert_eq!(seen, Some(Some(7)));
    }

    #[tokio::test]
    #[allow(clippy::panic)] // Tests are allowed to panic on failures
    async fn data_as_deserializes_at_the_selector_edge() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Item {
            id: String,
            n: i64,
        }

        let store = Store::new();
        let fetch = item_fetch("1");
        let merges = MergeEngine::new();

        let absent: Option<Item> = match store.data_as(&fetch).await {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(absent, None);

        store
            .commit_success(fetch.identity(), json!({ "id": "1", "n": 7 }), &merges)
            .await;
        let typed: Option<Item> = match store.data_as(&fetch).await {
            Ok(v) => v,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(
            typed,
            Some(Item {
                id: "1".into(),
                n: 7
            })
        );

        let mismatched: Result<Option<Vec<String>>, _> = store.data_as(&fetch).await;
        assert!(matches!(mismatched, Err(StoreError::Deserialize { .. })));
    }

    #[tokio::test]
    #[allow(clippy::panic)] // Tests are allowed to panic on failures
    async fn watch_filters_changes_to_one_identity() {
        let store = Store::new();
        let watched = item_fetch("1");
        let other = item_fetch("2");
        let merges = MergeEngine::new();

        let mut sub = store.watch(&watched);
        store.begin_load(other.identity()).await;
        store.begin_load(watched.identity()).await;
        store
            .commit_success(watched.identity(), json!({ "id": "1" }), &merges)
            .await;

        let first = match sub.changed().await {
            Ok(change) => change,
            Err(e) => panic!("subscription closed: {e}"),
        };
        assert_eq!(first.identity, *watched.identity());
        assert_eq!(first.status, Status::Loading);

        let second = match sub.changed().await {
            Ok(change) => change,
            Err(e) => panic!("subscription closed: {e}"),
        };
        assert_eq!(second.status, Status::Normal);
    }

    #[tokio::test]
    async fn subscription_errors_when_store_drops() {
        let store = Store::new();
        let fetch = item_fetch("1");
        let mut sub = store.watch(&fetch);
        drop(store);

        assert!(matches!(sub.changed().await, Err(StoreError::ChannelClosed)));
    }
}
