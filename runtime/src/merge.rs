//! Cross-namespace merge propagation.
//!
//! The [`MergeEngine`] holds every merge rule declared on the registered
//! fetch factories, indexed by *source* namespace: "when a value commits in
//! `noteItem`, offer it to these targets". When the store commits a settled
//! response it hands the engine the committed value, and the engine rewrites
//! whichever target entries their rules choose to change.
//!
//! # Rule Semantics
//!
//! A rule is a pure function `(current target data, committed source value)`
//! to `Option<new target data>`:
//!
//! - `None` leaves the target untouched: no write, no notification. This is
//!   how a list declines updates for items it does not contain, and how
//!   rules behave before the target has loaded at all.
//! - `Some(next)` replaces the target's data. The target's status absorbs
//!   the merge ([`Status::absorb_merge`](refetch_core::Status::absorb_merge)):
//!   settled and failed entries become `Normal`, entries with their own
//!   request in flight become `Refreshing`.
//!
//! Rules fire for every cached entry of the target namespace, so one item
//! commit can patch several cached lists in a single propagation pass.
//!
//! # Self-Merges
//!
//! A rule whose source equals its factory's own namespace is rejected at
//! registration. Same-namespace consistency is already what identity sharing
//! provides; a namespace feeding itself through the merge path would observe
//! its own half-applied commits.

use crate::store::{Entries, StoreChange};
use refetch_core::{CacheEntry, FetchFactory, MergeFn, Namespace};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The outcome of one propagation pass.
pub(crate) struct Propagation {
    /// Entries rewritten, in the order they were written.
    pub(crate) changes: SmallVec<[StoreChange; 4]>,
    /// Rule evaluations that returned `None`.
    pub(crate) skips: usize,
}

impl Propagation {
    const fn empty() -> Self {
        Self {
            changes: SmallVec::new_const(),
            skips: 0,
        }
    }
}

/// Registry of merge rules, indexed by source namespace.
///
/// Built once from the registered factories and shared read-only by the
/// dispatcher; propagation mutates entries, never the registry.
pub struct MergeEngine {
    rules: HashMap<Namespace, Vec<(Namespace, MergeFn)>>,
}

impl MergeEngine {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Register the merge rules a factory declares.
    ///
    /// Each rule subscribes the factory's namespace (the target) to commits
    /// in the rule's source namespace. Rules from a namespace onto itself are
    /// ignored with a warning.
    pub fn register(&mut self, factory: &FetchFactory) {
        for (source, rule) in factory.merge_rules() {
            if *source == factory.namespace() {
                tracing::warn!(
                    factory = factory.display_name(),
                    namespace = %factory.namespace(),
                    "ignoring merge rule from a namespace onto itself"
                );
                continue;
            }
            tracing::debug!(
                source = %source,
                target = %factory.namespace(),
                factory = factory.display_name(),
                "registered merge rule"
            );
            self.rules
                .entry(*source)
                .or_default()
                .push((factory.namespace(), Arc::clone(rule)));
        }
    }

    /// Total number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// Offer a committed value to every rule sourced from `source`.
    ///
    /// Runs inside the store's write-lock critical section, immediately after
    /// the source entry itself was committed, so every rule evaluation reads
    /// the just-committed value and the cache moves to its post-merge shape
    /// in one atomic step.
    pub(crate) fn propagate(
        &self,
        entries: &mut Entries,
        source: Namespace,
        value: &Value,
    ) -> Propagation {
        let Some(targets) = self.rules.get(&source) else {
            return Propagation::empty();
        };

        let mut changes = SmallVec::new();
        let mut skips = 0;
        for (target, rule) in targets {
            for identity in entries.identities_in(*target) {
                // Owned outcome first; the entry borrow must end before the write.
                let (next, prior) = match entries.get(&identity) {
                    Some(entry) => (rule(entry.data.as_ref(), value), entry.status),
                    None => continue,
                };
                match next {
                    Some(next_value) => {
                        let entry = CacheEntry::merged(prior, next_value);
                        let status = entry.status;
                        tracing::trace!(
                            source = %source,
                            target = %identity,
                            %status,
                            "merge rule rewrote entry"
                        );
                        entries.set(identity.clone(), entry);
                        changes.push(StoreChange { identity, status });
                    }
                    None => skips += 1,
                }
            }
        }
        Propagation { changes, skips }
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeEngine")
            .field("sources", &self.rules.len())
            .field("rules", &self.rule_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use refetch_core::{FetchIdentity, FetchKey, RequestSpec, Status};
    use serde_json::json;

    const LIST: Namespace = Namespace::new("list");
    const ITEM: Namespace = Namespace::new("item");

    fn list_identity(name: &str) -> FetchIdentity {
        FetchIdentity::new(LIST, FetchKey::from(name))
    }

    fn replace_all_factory() -> FetchFactory {
        FetchFactory::new("List", LIST, |_, _| RequestSpec::get("/list"))
            .with_merge(ITEM, |_, incoming| Some(incoming.clone()))
    }

    #[test]
    fn self_namespace_rules_are_rejected() {
        let factory = FetchFactory::new("List", LIST, |_, _| RequestSpec::get("/list"))
            .with_merge(LIST, |_, incoming| Some(incoming.clone()));

        let mut engine = MergeEngine::new();
        engine.register(&factory);
        assert_eq!(engine.rule_count(), 0);
    }

    #[test]
    fn propagate_without_rules_is_a_noop() {
        let engine = MergeEngine::new();
        let mut entries = Entries::new();
        entries.set(list_identity("a"), CacheEntry::succeed(json!([1])));

        let propagation = engine.propagate(&mut entries, ITEM, &json!({ "id": "x" }));
        assert!(propagation.changes.is_empty());
        assert_eq!(propagation.skips, 0);
    }

    #[test]
    fn propagate_rewrites_every_cached_target() {
        let mut engine = MergeEngine::new();
        engine.register(&replace_all_factory());

        let mut entries = Entries::new();
        entries.set(list_identity("a"), CacheEntry::succeed(json!("old")));
        entries.set(list_identity("b"), CacheEntry::succeed(json!("old")));

        let propagation = engine.propagate(&mut entries, ITEM, &json!("new"));
        assert_eq!(propagation.changes.len(), 2);
        assert_eq!(propagation.skips, 0);
        for name in ["a", "b"] {
            let entry = entries.get(&list_identity(name));
            assert_eq!(entry.map(|e| e.data.clone()), Some(Some(json!("new"))));
        }
    }

    #[test]
    fn declined_rules_count_as_skips() {
        let factory = FetchFactory::new("List", LIST, |_, _| RequestSpec::get("/list"))
            .with_merge(ITEM, |_, _| None);
        let mut engine = MergeEngine::new();
        engine.register(&factory);

        let mut entries = Entries::new();
        entries.set(list_identity("a"), CacheEntry::succeed(json!("old")));

        let propagation = engine.propagate(&mut entries, ITEM, &json!("new"));
        assert!(propagation.changes.is_empty());
        assert_eq!(propagation.skips, 1);
        let untouched = entries.get(&list_identity("a"));
        assert_eq!(untouched.map(|e| e.data.clone()), Some(Some(json!("old"))));
    }

    #[test]
    fn merged_entries_absorb_status() {
        let mut engine = MergeEngine::new();
        engine.register(&replace_all_factory());

        let mut entries = Entries::new();
        let refreshing = list_identity("inflight");
        entries.set(refreshing.clone(), CacheEntry::succeed(json!("old")).begin_load());
        let failed = list_identity("failed");
        entries.set(
            failed.clone(),
            CacheEntry::fail(refetch_core::TransportError::failed("boom")),
        );

        let propagation = engine.propagate(&mut entries, ITEM, &json!("new"));
        assert_eq!(propagation.changes.len(), 2);

        let statuses: Vec<Status> = ["inflight", "failed"]
            .into_iter()
            .map(|name| {
                entries
                    .get(&list_identity(name))
                    .map_or(Status::Uninitiated, |e| e.status)
            })
            .collect();
        assert_eq!(statuses, vec![Status::Refreshing, Status::Normal]);

        let cleared = entries.get(&failed).and_then(|e| e.error.clone());
        assert_eq!(cleared, None);
    }

    #[test]
    fn rules_only_fire_for_their_source() {
        let mut engine = MergeEngine::new();
        engine.register(&replace_all_factory());

        let mut entries = Entries::new();
        entries.set(list_identity("a"), CacheEntry::succeed(json!("old")));

        let propagation = engine.propagate(&mut entries, Namespace::new("other"), &json!("new"));
        assert!(propagation.changes.is_empty());
        let untouched = entries.get(&list_identity("a"));
        assert_eq!(untouched.map(|e| e.data.clone()), Some(Some(json!("old"))));
    }

    proptest! {
        /// Writes plus skips always account for every cached target entry.
        #[test]
        fn every_target_entry_is_written_or_skipped(
            flags in prop::collection::vec(any::<bool>(), 0..12),
        ) {
            let factory = FetchFactory::new("List", LIST, |_, _| RequestSpec::get("/list"))
                .with_merge(ITEM, |current, incoming| {
                    current
                        .and_then(Value::as_bool)
                        .unwrap_or(false)
                        .then(|| incoming.clone())
                });
            let mut engine = MergeEngine::new();
            engine.register(&factory);

            let mut entries = Entries::new();
            for (n, flag) in flags.iter().enumerate() {
                entries.set(list_identity(&n.to_string()), CacheEntry::succeed(json!(flag)));
            }

            let propagation = engine.propagate(&mut entries, ITEM, &json!("new"));
            let accepted = flags.iter().filter(|flag| **flag).count();
            prop_assert_eq!(propagation.changes.len(), accepted);
            prop_assert_eq!(propagation.skips, flags.len() - accepted);
        }
    }
}
