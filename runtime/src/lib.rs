//! # Refetch Runtime
//!
//! Runtime implementation for the Refetch shared fetch cache.
//!
//! This crate provides the store that holds cached fetch state and the
//! dispatcher that executes fetches against a transport and commits their
//! outcomes.
//!
//! ## Core Components
//!
//! - **Store**: identity-to-entry cache with selectors, a conditional-render
//!   guard, and a change broadcast
//! - **Dispatcher**: the loading → request → commit pipeline, one pass per
//!   dispatch
//! - **`MergeEngine`**: declarative cross-namespace propagation, run inside
//!   the commit's critical section
//!
//! ## Example
//!
//! ```ignore
//! use refetch_runtime::Dispatcher;
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::builder(Arc::new(transport))
//!     .with_factory(&note_list)
//!     .with_factory(&update_note)
//!     .build();
//! let store = Arc::clone(dispatcher.store());
//!
//! // Execute a fetch
//! dispatcher.dispatch(&note_list.make(FetchKey::root())).await?;
//!
//! // Read its state
//! let notes = store.data_as::<Vec<Note>>(&note_list.make(FetchKey::root())).await?;
//! ```

/// The dispatch pipeline
pub mod dispatch;

/// Error types for the store runtime
pub mod error;

/// Cross-namespace merge propagation
pub mod merge;

/// Metrics for observability
pub mod metrics;

/// The shared fetch cache
pub mod store;

pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use error::StoreError;
pub use merge::MergeEngine;
pub use store::{Store, StoreChange, Subscription};
