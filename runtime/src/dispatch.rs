//! The dispatch pipeline.
//!
//! A [`Dispatcher`] executes fetch descriptors against a transport and
//! commits the outcomes into its [`Store`]. One dispatch is one pass through
//! a fixed pipeline:
//!
//! ```text
//! dispatch(fetch)
//!   1. commit loading status   (Loading, or Refreshing when data exists)
//!   2. build RequestSpec       (fetch's request fn: key + optional args)
//!   3. transport.call(request).await
//!   4a. Ok(body)  → transform → commit Normal → merge propagation → Ok(value)
//!   4b. Err(e)    → commit Error                                  → Err(e)
//! ```
//!
//! The returned `Result` mirrors what was committed, so callers that need to
//! sequence on completion (close a dialog after a create, navigate after a
//! delete) can simply `.await` the dispatch and branch on it; consumers that
//! only render state keep reading the store.
//!
//! # Concurrent Dispatches
//!
//! Dispatches of the same identity are not coalesced: each one issues its own
//! request, and commits land in resolution order, so the cache converges on
//! the last response to settle. Earlier responses are visible at most
//! transiently. If two writes race, the transport's backend decides the
//! truth; the cache never invents an ordering the backend did not see.
//!
//! # Example
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::builder(Arc::new(transport))
//!     .with_factory(&note_list)
//!     .with_factory(&update_note)
//!     .build();
//!
//! let updated = dispatcher
//!     .dispatch_with(&update_note.make("42"), json!({ "content": "edited" }))
//!     .await?;
//! ```

use crate::merge::MergeEngine;
use crate::metrics::DispatchMetrics;
use crate::store::Store;
use refetch_core::{FetchDescriptor, FetchFactory, Transport, TransportError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Executes fetches and commits their outcomes.
///
/// Cheap to clone: the store, transport, and merge registry are all shared.
/// Build one at startup with every factory registered, then hand clones to
/// whatever needs to dispatch.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
    transport: Arc<dyn Transport>,
    merges: Arc<MergeEngine>,
}

impl Dispatcher {
    /// Start building a dispatcher around a transport.
    #[must_use]
    pub fn builder(transport: Arc<dyn Transport>) -> DispatcherBuilder {
        DispatcherBuilder {
            transport,
            store: None,
            change_capacity: None,
            merges: MergeEngine::new(),
        }
    }

    /// The store this dispatcher commits into.
    #[must_use]
    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Dispatch a fetch with no request arguments.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] the request settled with; the same
    /// error is committed to the fetch's cache entry.
    pub async fn dispatch(&self, fetch: &FetchDescriptor) -> Result<Value, TransportError> {
        self.dispatch_inner(fetch, None).await
    }

    /// Dispatch a fetch with request arguments.
    ///
    /// The arguments are handed to the fetch's request function, which
    /// typically folds them into the request payload (update content, create
    /// fields).
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] the request settled with; the same
    /// error is committed to the fetch's cache entry.
    pub async fn dispatch_with(
        &self,
        fetch: &FetchDescriptor,
        args: Value,
    ) -> Result<Value, TransportError> {
        self.dispatch_inner(fetch, Some(args)).await
    }

    #[tracing::instrument(skip(self, fetch, args), name = "dispatch_fetch")]
    async fn dispatch_inner(
        &self,
        fetch: &FetchDescriptor,
        args: Option<Value>,
    ) -> Result<Value, TransportError> {
        let identity = fetch.identity();
        let status = self.store.begin_load(identity).await;
        tracing::debug!(fetch = fetch.display_name(), identity = %identity, %status, "dispatching");

        let request = fetch.request(args.as_ref());
        tracing::trace!(request = %request, "issuing transport request");
        let started = Instant::now();
        let outcome = self.transport.call(request).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(body) => {
                let value = fetch.transform(body);
                let merged = self
                    .store
                    .commit_success(identity, value.clone(), &self.merges)
                    .await;
                DispatchMetrics::record_success(elapsed);
                tracing::debug!(identity = %identity, merged, elapsed = ?elapsed, "dispatch settled normal");
                Ok(value)
            }
            Err(error) => {
                self.store.commit_failure(identity, error.clone()).await;
                DispatchMetrics::record_error(elapsed);
                tracing::warn!(identity = %identity, %error, "dispatch settled with error");
                Err(error)
            }
        }
    }
}

/// Builder for [`Dispatcher`].
///
/// Registers factories (collecting their merge rules) and optionally injects
/// a shared [`Store`].
pub struct DispatcherBuilder {
    transport: Arc<dyn Transport>,
    store: Option<Arc<Store>>,
    change_capacity: Option<usize>,
    merges: MergeEngine,
}

impl DispatcherBuilder {
    /// Register a factory, installing its merge rules.
    ///
    /// Factories without merge rules do not strictly need registration, but
    /// registering every factory at startup keeps the rule registry complete
    /// and the wiring in one place.
    #[must_use]
    pub fn with_factory(mut self, factory: &FetchFactory) -> Self {
        self.merges.register(factory);
        self
    }

    /// Use an existing store instead of building a fresh one.
    ///
    /// Hand the same `Arc<Store>` to several dispatchers to share one cache
    /// across transports.
    #[must_use]
    pub fn with_store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Change channel capacity for the store this builder creates.
    ///
    /// Has no effect when an existing store is supplied via
    /// [`DispatcherBuilder::with_store`].
    #[must_use]
    pub const fn with_change_capacity(mut self, capacity: usize) -> Self {
        self.change_capacity = Some(capacity);
        self
    }

    /// Finish the dispatcher.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        let Self {
            transport,
            store,
            change_capacity,
            merges,
        } = self;
        let store = store.unwrap_or_else(|| {
            Arc::new(change_capacity.map_or_else(Store::new, Store::with_capacity))
        });
        tracing::debug!(rules = merges.rule_count(), "dispatcher built");
        Dispatcher {
            store,
            transport,
            merges: Arc::new(merges),
        }
    }
}
