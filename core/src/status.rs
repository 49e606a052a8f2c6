//! Fetch status lifecycle.
//!
//! Every cache entry carries a [`Status`] describing where its fetch is in the
//! request lifecycle. Consumers read status through coarse predicates
//! ([`Status::is_normal`], [`Status::is_loading`]) rather than matching exact
//! variants, so UI code stays correct as entries move between first loads and
//! background refreshes.
//!
//! # Lifecycle
//!
//! ```text
//!                 dispatch              resolve Ok
//! Uninitiated ──────────────► Loading ──────────────► Normal
//!                                │                      │
//!                                │ resolve Err          │ dispatch
//!                                ▼                      ▼
//!                              Error ◄────────────  Refreshing
//!                                │    resolve Err       │
//!                                │ dispatch             │ resolve Ok
//!                                └──────► Loading       ▼
//!                                                     Normal
//! ```
//!
//! The two derived predicates overlap deliberately: `Refreshing` is both
//! "normal" (stale data is present and usable) and "loading" (a request is in
//! flight). A first-load spinner is therefore `is_loading() && !is_normal()`,
//! while a background sync indicator is `is_normal() && is_loading()`.

use std::fmt;

/// Where a cache entry sits in the fetch lifecycle.
///
/// Statuses are produced by the store's commit operations and never set
/// directly by consumers. The transitions live in [`Status::begin_load`]
/// (request issued) and [`Status::absorb_merge`] (data arrived via a merge
/// rule); resolution to `Normal` or `Error` happens when the entry's own
/// request settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// No request has been dispatched for this identity yet.
    #[default]
    Uninitiated,

    /// A request is in flight and no previous data exists.
    Loading,

    /// A request is in flight while previously fetched data remains visible.
    Refreshing,

    /// The most recent request settled successfully; data is current.
    Normal,

    /// The most recent request settled with an error; no data is held.
    Error,
}

impl Status {
    /// Whether usable data is present.
    ///
    /// True for `Normal` and `Refreshing`. Consumers that render data should
    /// branch on this rather than on `== Status::Normal`, so stale-but-valid
    /// data stays on screen during background refreshes.
    #[must_use]
    pub const fn is_normal(self) -> bool {
        matches!(self, Self::Normal | Self::Refreshing)
    }

    /// Whether a request is currently in flight.
    ///
    /// True for `Loading` and `Refreshing`.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading | Self::Refreshing)
    }

    /// Whether the most recent request settled with an error.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Status after a new request is dispatched for this identity.
    ///
    /// Entries with visible data (`Normal`, `Refreshing`) move to `Refreshing`
    /// so the data stays usable while the request runs. Everything else moves
    /// to `Loading`.
    #[must_use]
    pub const fn begin_load(self) -> Self {
        match self {
            Self::Normal | Self::Refreshing => Self::Refreshing,
            Self::Uninitiated | Self::Loading | Self::Error => Self::Loading,
        }
    }

    /// Status after a merge rule writes data into this entry.
    ///
    /// Merged data is real data, so the entry becomes `Normal` unless its own
    /// request is still in flight, in which case it becomes `Refreshing` (data
    /// present, request pending).
    #[must_use]
    pub const fn absorb_merge(self) -> Self {
        match self {
            Self::Loading | Self::Refreshing => Self::Refreshing,
            Self::Uninitiated | Self::Normal | Self::Error => Self::Normal,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitiated => "uninitiated",
            Self::Loading => "loading",
            Self::Refreshing => "refreshing",
            Self::Normal => "normal",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::Uninitiated),
            Just(Status::Loading),
            Just(Status::Refreshing),
            Just(Status::Normal),
            Just(Status::Error),
        ]
    }

    #[test]
    fn begin_load_without_data_enters_loading() {
        assert_eq!(Status::Uninitiated.begin_load(), Status::Loading);
        assert_eq!(Status::Error.begin_load(), Status::Loading);
        assert_eq!(Status::Loading.begin_load(), Status::Loading);
    }

    #[test]
    fn begin_load_with_visible_data_enters_refreshing() {
        assert_eq!(Status::Normal.begin_load(), Status::Refreshing);
        assert_eq!(Status::Refreshing.begin_load(), Status::Refreshing);
    }

    #[test]
    fn absorb_merge_settles_idle_entries() {
        assert_eq!(Status::Normal.absorb_merge(), Status::Normal);
        assert_eq!(Status::Error.absorb_merge(), Status::Normal);
        assert_eq!(Status::Uninitiated.absorb_merge(), Status::Normal);
    }

    #[test]
    fn absorb_merge_keeps_inflight_requests_visible() {
        assert_eq!(Status::Loading.absorb_merge(), Status::Refreshing);
        assert_eq!(Status::Refreshing.absorb_merge(), Status::Refreshing);
    }

    #[test]
    fn refreshing_is_both_normal_and_loading() {
        assert!(Status::Refreshing.is_normal());
        assert!(Status::Refreshing.is_loading());
    }

    #[test]
    fn first_load_spinner_predicate_distinguishes_refresh() {
        // A list screen shows a blocking spinner only on first load.
        let first_load = Status::Loading;
        let background_refresh = Status::Refreshing;
        assert!(first_load.is_loading() && !first_load.is_normal());
        assert!(!(background_refresh.is_loading() && !background_refresh.is_normal()));
    }

    #[test]
    fn display_uses_lowercase_names() {
        assert_eq!(Status::Refreshing.to_string(), "refreshing");
        assert_eq!(Status::Uninitiated.to_string(), "uninitiated");
    }

    proptest! {
        #[test]
        fn begin_load_always_reports_loading(status in any_status()) {
            prop_assert!(status.begin_load().is_loading());
        }

        #[test]
        fn absorb_merge_always_reports_normal(status in any_status()) {
            prop_assert!(status.absorb_merge().is_normal());
        }

        #[test]
        fn begin_load_never_loses_visible_data(status in any_status()) {
            // Data visibility (is_normal) survives the start of a new request.
            prop_assert_eq!(status.begin_load().is_normal(), status.is_normal());
        }
    }
}
