//! # Refetch Core
//!
//! Core traits and types for the Refetch shared fetch cache.
//!
//! This crate provides the vocabulary for describing data fetches
//! declaratively: what a fetch is identified by, what request it issues, and
//! how its responses relate to other cached data. The runtime crate supplies
//! the store and dispatcher that execute these descriptions.
//!
//! ## Core Concepts
//!
//! - **Namespace**: a static name for one kind of cached value
//! - **`FetchKey`**: the bound arguments of a fetch, as ordered segments
//! - **`FetchIdentity`**: namespace + key; decides which cache entry a fetch
//!   reads and writes
//! - **`FetchFactory` / `FetchDescriptor`**: reusable definition and bound
//!   handle for a fetch
//! - **Status**: the `Uninitiated → Loading → Normal / Error` lifecycle, with
//!   `Refreshing` for reloads that keep data visible
//! - **`CacheEntry`**: status + data + error snapshot per identity
//! - **Transport**: the single seam to the outside world, `RequestSpec` in,
//!   JSON value out
//!
//! ## Architecture Principles
//!
//! - Identity decides sharing: same (namespace, key) means same cache entry
//! - Writes are reads: mutations commit their responses into the same cache
//! - Merges are declarative: cross-namespace consistency is data, not
//!   callbacks scattered through consumers
//! - Opaque payloads: values are JSON in the cache, typed at the selector edge
//!
//! ## Example
//!
//! ```
//! use refetch_core::{FetchFactory, Namespace, RequestSpec};
//!
//! const NOTE_LIST: Namespace = Namespace::new("noteList");
//! const NOTE_ITEM: Namespace = Namespace::new("noteItem");
//!
//! // The list subscribes to item commits: an updated note is stitched into
//! // the cached list without a refetch.
//! let note_list = FetchFactory::new("Get Note List", NOTE_LIST, |_, _| {
//!     RequestSpec::get("/notes")
//! })
//! .with_merge(NOTE_ITEM, |list, item| {
//!     let notes = list?.as_array()?;
//!     let id = item.get("id")?.as_str()?;
//!     let index = notes
//!         .iter()
//!         .position(|note| note.get("id").and_then(|v| v.as_str()) == Some(id))?;
//!     let mut next = notes.clone();
//!     *next.get_mut(index)? = item.clone();
//!     Some(next.into())
//! });
//!
//! let list_fetch = note_list.make(refetch_core::FetchKey::root());
//! assert_eq!(list_fetch.request(None).route, "/notes");
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use serde_json::Value;

pub mod entry;
pub mod fetch;
pub mod request;
pub mod status;
pub mod transport;

pub use entry::CacheEntry;
pub use fetch::{
    FetchDescriptor, FetchFactory, FetchIdentity, FetchKey, MergeFn, Namespace, RequestFn,
    TransformFn,
};
pub use request::{Method, RequestSpec};
pub use status::Status;
pub use transport::{Transport, TransportError, TransportFuture};
