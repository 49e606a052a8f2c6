//! # Notes Example
//!
//! A small CRUD app over the shared fetch cache.
//!
//! This example showcases:
//! - One fetch factory per endpoint, with get/update/delete of a note
//!   sharing a single cache entry through namespace identity
//! - Merge rules keeping every cached list fresh after item commits,
//!   creations, and deletions, without refetching
//! - A tombstone transform turning an empty delete response into a value
//!   the list merge understands
//! - An in-process mock backend with latency and not-found semantics
//!
//! ## Example
//!
//! ```no_run
//! use notes::{Note, NoteFetches, NotesApi};
//! use refetch_runtime::Dispatcher;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let api = NotesApi::new(vec![Note::new("a", "# A")]);
//! let fetches = NoteFetches::new();
//! let transport = Arc::new(api.into_transport(Duration::from_millis(250)));
//! let dispatcher = fetches.install(Dispatcher::builder(transport)).build();
//!
//! let _ = dispatcher.dispatch(&fetches.list()).await;
//! let notes: Option<Vec<Note>> = dispatcher
//!     .store()
//!     .data_as(&fetches.list())
//!     .await
//!     .unwrap_or_default();
//! # }
//! ```

pub mod api;
pub mod fetches;
pub mod note;

pub use api::NotesApi;
pub use fetches::NoteFetches;
pub use note::Note;
