//! Cache entries: the unit of state held per fetch identity.
//!
//! A [`CacheEntry`] bundles the three things a consumer can observe about a
//! fetch: its [`Status`], its last committed data, and its last error. Entries
//! are immutable snapshots; the store replaces the whole entry on every
//! commit, so a reader never sees a half-updated record.
//!
//! # Field Invariants
//!
//! | Status        | `data`        | `error` |
//! |---------------|---------------|---------|
//! | `Uninitiated` | `None`        | `None`  |
//! | `Loading`     | `None`        | `None`  |
//! | `Refreshing`  | `Some`        | `None`  |
//! | `Normal`      | `Some`        | `None`  |
//! | `Error`       | `None`        | `Some`  |
//!
//! The constructors below are the only ways entries are produced, which is
//! what keeps the table true: `begin_load` carries data forward and drops any
//! stale error, `succeed` and `merged` install data, `fail` installs an error.

use crate::status::Status;
use crate::transport::TransportError;
use serde_json::Value;

/// Snapshot of one fetch identity's cached state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheEntry {
    /// Lifecycle position of this entry.
    pub status: Status,
    /// Most recently committed data, if any.
    pub data: Option<Value>,
    /// Error from the most recent settled request, if it failed.
    pub error: Option<TransportError>,
}

impl CacheEntry {
    /// An entry nothing has been dispatched for. Equivalent to `Default`.
    #[must_use]
    pub const fn uninitiated() -> Self {
        Self {
            status: Status::Uninitiated,
            data: None,
            error: None,
        }
    }

    /// Entry state after a request is dispatched against this one.
    ///
    /// Existing data stays visible (moving the entry to `Refreshing`); a stale
    /// error from a previous attempt is cleared so consumers do not render an
    /// old failure next to a fresh spinner.
    #[must_use]
    pub fn begin_load(&self) -> Self {
        Self {
            status: self.status.begin_load(),
            data: self.data.clone(),
            error: None,
        }
    }

    /// Entry state after this identity's own request resolved successfully.
    #[must_use]
    pub const fn succeed(value: Value) -> Self {
        Self {
            status: Status::Normal,
            data: Some(value),
            error: None,
        }
    }

    /// Entry state after this identity's own request resolved with an error.
    ///
    /// Data is dropped: the error is now the truth about this identity, and
    /// keeping stale data alongside it would let consumers render a record
    /// that the backend just refused to produce.
    #[must_use]
    pub const fn fail(error: TransportError) -> Self {
        Self {
            status: Status::Error,
            data: None,
            error: Some(error),
        }
    }

    /// Entry state after a merge rule wrote `value` into an entry whose prior
    /// status was `prior`.
    ///
    /// Merged data settles the entry to `Normal` unless its own request is
    /// still in flight (then `Refreshing`). Any previous error is cleared.
    #[must_use]
    pub const fn merged(prior: Status, value: Value) -> Self {
        Self {
            status: prior.absorb_merge(),
            data: Some(value),
            error: None,
        }
    }

    /// Whether this entry currently holds data.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.data.is_some()
    }
}
