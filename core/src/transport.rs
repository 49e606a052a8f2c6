//! Transport abstraction for issuing requests.
//!
//! This module provides the [`Transport`] trait, the single seam between the
//! dispatch pipeline and the outside world. A transport receives a fully
//! formed [`RequestSpec`] and resolves it to a JSON value or a
//! [`TransportError`]; everything else in the system (status transitions,
//! cache commits, merge propagation) is pure bookkeeping around that call.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   RequestSpec   ┌──────────────┐
//! │  Dispatcher  │ ──────────────► │  Transport   │
//! │              │ ◄────────────── │  (HTTP, mock)│
//! └──────────────┘  Result<Value>  └──────────────┘
//! ```
//!
//! # Key Principles
//!
//! - **One request, one response**: transports do not cache, retry, or merge.
//!   Those concerns belong to the store and dispatcher.
//! - **Opaque payloads**: request and response bodies are `serde_json::Value`;
//!   typed views happen at the selector edge, not in the transport.
//! - **Send + Sync**: implementations are shared behind `Arc<dyn Transport>`
//!   across concurrent dispatches.
//!
//! # Implementations
//!
//! - `MockTransport` (in `refetch-testing`) — routes requests to in-process
//!   handlers with simulated latency, for tests and demos.

use crate::request::RequestSpec;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors a transport can resolve with.
///
/// Transport errors are stored verbatim in the cache entry that dispatched the
/// request, so they derive `Clone` and `PartialEq` for cheap commit and easy
/// assertion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The requested route does not exist or the resource is gone.
    #[error("not found: {route}")]
    NotFound {
        /// The route that could not be resolved.
        route: String,
    },

    /// The request failed for any other reason.
    #[error("request failed: {reason}")]
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl TransportError {
    /// Build a [`TransportError::NotFound`] for the given route.
    #[must_use]
    pub fn not_found(route: impl Into<String>) -> Self {
        Self::NotFound {
            route: route.into(),
        }
    }

    /// Build a [`TransportError::Failed`] with the given reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether this error is a missing-resource error.
    ///
    /// Useful for consumers that treat "gone" differently from "broken", such
    /// as a detail view redirecting away from a deleted record.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Future returned by [`Transport::call`].
///
/// Boxed and pinned so the trait stays dyn-compatible; the dispatcher holds
/// transports as `Arc<dyn Transport>`.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, TransportError>> + Send + 'a>>;

/// Trait for request transports.
///
/// The dispatcher calls [`Transport::call`] exactly once per dispatch, after
/// committing the loading status and before committing the settled result.
/// Implementations decide what a route string means; the core never inspects
/// routes.
///
/// # Dyn Compatibility
///
/// This trait uses an explicit `Pin<Box<dyn Future>>` return instead of
/// `async fn` so it can be used as a trait object (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// Resolve a request to a response body.
    ///
    /// # Arguments
    ///
    /// - `request`: the method, route, and optional payload to issue
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotFound`] when the route cannot be resolved
    /// and [`TransportError::Failed`] for any other failure. Both settle the
    /// dispatching entry into the error state.
    fn call(&self, request: RequestSpec) -> TransportFuture<'_>;
}
