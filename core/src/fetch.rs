//! Fetch identity: namespaces, keys, factories, and descriptors.
//!
//! A fetch is identified by a ([`Namespace`], [`FetchKey`]) pair, and that
//! pair alone decides which cache entry it reads and writes. Two descriptors
//! with the same identity share state even when they were made by different
//! factories with different request logic. This is the mechanism behind
//! read/write sharing: a "get note" factory and an "update note" factory both
//! declare the `noteItem` namespace, so an update's response lands exactly
//! where the next read looks.
//!
//! # Concepts
//!
//! - **[`Namespace`]**: a static name for one kind of cached value
//!   (`"noteList"`, `"noteItem"`).
//! - **[`FetchKey`]**: the bound arguments of a fetch, as ordered string
//!   segments. Singleton fetches use [`FetchKey::root`].
//! - **[`FetchIdentity`]**: namespace + key; the cache map key.
//! - **[`FetchFactory`]**: a reusable definition (namespace, request builder,
//!   optional response transform, merge rules). Calling [`FetchFactory::make`]
//!   binds a key and yields a descriptor.
//! - **[`FetchDescriptor`]**: a bound fetch, ready to dispatch or select with.
//!
//! # Example
//!
//! ```
//! use refetch_core::fetch::{FetchFactory, Namespace};
//! use refetch_core::request::RequestSpec;
//!
//! const NOTE_ITEM: Namespace = Namespace::new("noteItem");
//!
//! let get_note = FetchFactory::new("Get Note", NOTE_ITEM, |key, _args| {
//!     RequestSpec::get(format!("/notes/{key}"))
//! });
//! let update_note = FetchFactory::new("Update Note", NOTE_ITEM, |key, args| {
//!     RequestSpec::put(format!("/notes/{key}"), args.cloned())
//! });
//!
//! // Same namespace, same key: one shared cache entry.
//! assert_eq!(get_note.make("42").identity(), update_note.make("42").identity());
//! assert_ne!(get_note.make("42").identity(), get_note.make("43").identity());
//! ```

use crate::request::RequestSpec;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A static name for one kind of cached value.
///
/// Namespaces are deliberately `&'static str` newtypes: they are declared as
/// constants next to the factories that use them, and sharing a namespace is a
/// deliberate, visible act rather than a string collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace(&'static str);

impl Namespace {
    /// Declare a namespace.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The namespace's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The bound arguments of a fetch, as ordered string segments.
///
/// Keys are compared structurally: `FetchKey::new(["a", "b"])` equals any
/// other key with exactly those segments in that order. Argument order is
/// significant, so binding `("a", "b")` and `("b", "a")` produces distinct
/// identities.
///
/// Segments are stored behind an `Arc` so cloning a key (which happens on
/// every dispatch and selector call) never reallocates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey(Arc<[String]>);

impl FetchKey {
    /// The empty key, for singleton fetches bound to no arguments.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new().into())
    }

    /// Build a key from ordered segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect::<Vec<_>>().into())
    }

    /// The key's segments in binding order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether this is the empty (root) key.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for FetchKey {
    /// A single-segment key. Handy for the common one-argument fetch.
    fn from(segment: &str) -> Self {
        Self::new([segment])
    }
}

impl From<String> for FetchKey {
    fn from(segment: String) -> Self {
        Self::new([segment])
    }
}

impl fmt::Display for FetchKey {
    /// Segments joined with `/`, matching how keys typically appear in routes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Namespace plus key: the cache map key.
///
/// Everything the store holds is indexed by identity, and every notification
/// names the identity it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchIdentity {
    namespace: Namespace,
    key: FetchKey,
}

impl FetchIdentity {
    /// Build an identity directly. Factories normally do this via
    /// [`FetchFactory::make`].
    #[must_use]
    pub const fn new(namespace: Namespace, key: FetchKey) -> Self {
        Self { namespace, key }
    }

    /// The identity's namespace.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// The identity's key.
    #[must_use]
    pub const fn key(&self) -> &FetchKey {
        &self.key
    }
}

impl fmt::Display for FetchIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.namespace, self.key)
    }
}

/// Builds a request from the fetch key and optional dispatch arguments.
pub type RequestFn = Arc<dyn Fn(&FetchKey, Option<&Value>) -> RequestSpec + Send + Sync>;

/// Reshapes a transport response before it is committed to the cache.
///
/// Runs on the dispatching fetch's own response only; merged namespaces
/// receive the transformed value.
pub type TransformFn = Arc<dyn Fn(&FetchKey, Value) -> Value + Send + Sync>;

/// A declarative merge rule: `(current target data, incoming source value)`
/// to an optional replacement for the target's data.
///
/// Returning `None` means "no change": the target entry is left untouched and
/// no notification is published for it. Rules must be pure functions of their
/// two arguments.
pub type MergeFn = Arc<dyn Fn(Option<&Value>, &Value) -> Option<Value> + Send + Sync>;

/// A reusable fetch definition.
///
/// A factory owns everything about a kind of fetch except its key: the
/// namespace it reads and writes, how to build its request, how to reshape its
/// response, and which other namespaces feed it via merge rules. Factories are
/// cheap to clone and are registered with the dispatcher once at startup.
#[derive(Clone)]
pub struct FetchFactory {
    display_name: &'static str,
    namespace: Namespace,
    request: RequestFn,
    transform: Option<TransformFn>,
    merges: Vec<(Namespace, MergeFn)>,
}

impl FetchFactory {
    /// Define a fetch.
    ///
    /// # Arguments
    ///
    /// - `display_name`: human-readable name for logs and diagnostics
    /// - `namespace`: the cache namespace this fetch reads and writes
    /// - `request`: builds the request from the bound key and any arguments
    ///   passed at dispatch time
    pub fn new(
        display_name: &'static str,
        namespace: Namespace,
        request: impl Fn(&FetchKey, Option<&Value>) -> RequestSpec + Send + Sync + 'static,
    ) -> Self {
        Self {
            display_name,
            namespace,
            request: Arc::new(request),
            transform: None,
            merges: Vec::new(),
        }
    }

    /// Reshape this fetch's responses before they are committed.
    ///
    /// Used when the transport's response is not the value that should live in
    /// the cache, such as synthesizing a tombstone from an empty delete
    /// response.
    #[must_use]
    pub fn with_transform(
        mut self,
        transform: impl Fn(&FetchKey, Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Subscribe this factory's namespace to values committed in `source`.
    ///
    /// Whenever any fetch in `source` commits a value, `rule` is offered that
    /// value together with each of this namespace's cached entries, and may
    /// return replacement data for them. Rules run in registration order.
    #[must_use]
    pub fn with_merge(
        mut self,
        source: Namespace,
        rule: impl Fn(Option<&Value>, &Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.merges.push((source, Arc::new(rule)));
        self
    }

    /// Human-readable name for logs.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        self.display_name
    }

    /// The namespace this factory reads and writes.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// The merge rules declared on this factory, in registration order. Each
    /// pair is `(source namespace, rule)`.
    #[must_use]
    pub fn merge_rules(&self) -> &[(Namespace, MergeFn)] {
        &self.merges
    }

    /// Bind a key, producing a dispatchable descriptor.
    #[must_use]
    pub fn make(&self, key: impl Into<FetchKey>) -> FetchDescriptor {
        FetchDescriptor {
            display_name: self.display_name,
            identity: FetchIdentity::new(self.namespace, key.into()),
            request: Arc::clone(&self.request),
            transform: self.transform.clone(),
        }
    }
}

impl fmt::Debug for FetchFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchFactory")
            .field("display_name", &self.display_name)
            .field("namespace", &self.namespace)
            .field("merges", &self.merges.len())
            .finish_non_exhaustive()
    }
}

/// A fetch bound to a key: the handle consumers dispatch and select with.
///
/// Descriptors are cheap to clone (the request and transform closures are
/// shared), and equality of their [identities](FetchDescriptor::identity) is
/// what makes separate call sites observe the same cache entry.
#[derive(Clone)]
pub struct FetchDescriptor {
    display_name: &'static str,
    identity: FetchIdentity,
    request: RequestFn,
    transform: Option<TransformFn>,
}

impl FetchDescriptor {
    /// Human-readable name for logs.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        self.display_name
    }

    /// The identity this descriptor reads and writes.
    #[must_use]
    pub const fn identity(&self) -> &FetchIdentity {
        &self.identity
    }

    /// Shorthand for this descriptor's namespace.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.identity.namespace()
    }

    /// Shorthand for this descriptor's key.
    #[must_use]
    pub const fn key(&self) -> &FetchKey {
        self.identity.key()
    }

    /// Build this fetch's request from its key and the given arguments.
    #[must_use]
    pub fn request(&self, args: Option<&Value>) -> RequestSpec {
        (self.request)(self.identity.key(), args)
    }

    /// Apply this fetch's response transform, if any.
    #[must_use]
    pub fn transform(&self, body: Value) -> Value {
        match &self.transform {
            Some(transform) => transform(self.identity.key(), body),
            None => body,
        }
    }
}

impl fmt::Debug for FetchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchDescriptor")
            .field("display_name", &self.display_name)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
