//! In-process mock transport.
//!
//! [`MockTransport`] resolves requests against a route table of in-process
//! handlers, with optional simulated latency and a log of every request
//! served. It stands in for a real backend in tests and demos: handlers are
//! plain synchronous closures over whatever state the fake backend keeps.
//!
//! # Route Patterns
//!
//! Patterns are slash-separated segments; a segment starting with `:`
//! captures the corresponding request segment into
//! [`MockRequest::params`]:
//!
//! - `/notes` matches exactly `/notes`
//! - `/notes/:id` matches `/notes/abc` with `params["id"] == "abc"`
//!
//! Matching requires the same method and the same segment count; the first
//! matching route wins, so register literal routes before parameterized ones
//! when they could overlap.

use refetch_core::{Method, RequestSpec, Transport, TransportError, TransportFuture};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Handler invoked for a matched route.
pub type MockHandler = Box<dyn Fn(MockRequest) -> Result<Value, TransportError> + Send + Sync>;

/// A matched request, as seen by a handler.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Request verb.
    pub method: Method,
    /// The literal route that was requested.
    pub route: String,
    /// Captures from `:param` pattern segments.
    pub params: HashMap<String, String>,
    /// JSON body, if the request carried one.
    pub payload: Option<Value>,
}

impl MockRequest {
    /// A captured parameter, or empty string when the pattern had no such
    /// capture. Mock handlers prefer shortness over `Option` plumbing here;
    /// a missing capture is a bug in the test's own route table.
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct MockRoute {
    method: Method,
    pattern: Vec<Segment>,
    handler: MockHandler,
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment.strip_prefix(':').map_or_else(
                || Segment::Literal(segment.to_string()),
                |name| Segment::Param(name.to_string()),
            )
        })
        .collect()
}

fn match_segments(pattern: &[Segment], route: &str) -> Option<HashMap<String, String>> {
    let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() != pattern.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (expected, actual) in pattern.iter().zip(segments) {
        match expected {
            Segment::Literal(literal) if literal == actual => {}
            Segment::Literal(_) => return None,
            Segment::Param(name) => {
                params.insert(name.clone(), actual.to_string());
            }
        }
    }
    Some(params)
}

/// A transport backed by an in-process route table.
///
/// # Example
///
/// ```
/// use refetch_testing::MockTransport;
/// use refetch_core::{Method, RequestSpec, Transport};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = MockTransport::new()
///     .route(Method::Get, "/notes/:id", |req| {
///         Ok(json!({ "id": req.param("id") }))
///     });
///
/// let body = transport.call(RequestSpec::get("/notes/42")).await;
/// assert_eq!(body, Ok(json!({ "id": "42" })));
/// # }
/// ```
pub struct MockTransport {
    routes: Vec<MockRoute>,
    latency: Duration,
    served: Mutex<Vec<RequestSpec>>,
}

impl MockTransport {
    /// An empty transport: every request resolves not-found.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            latency: Duration::ZERO,
            served: Mutex::new(Vec::new()),
        }
    }

    /// Delay every request by `latency` before resolving it.
    ///
    /// Makes loading states observable in demos and lets paused-time tests
    /// inspect the cache mid-request.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Register a route.
    ///
    /// See the module docs for pattern syntax. Routes are tried in
    /// registration order.
    #[must_use]
    pub fn route(
        mut self,
        method: Method,
        pattern: &str,
        handler: impl Fn(MockRequest) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Self {
        self.routes.push(MockRoute {
            method,
            pattern: parse_pattern(pattern),
            handler: Box::new(handler),
        });
        self
    }

    /// Every request served so far, in arrival order.
    ///
    /// Requests are recorded whether or not a route matched, so tests can
    /// assert both on traffic that happened and on traffic that did not.
    #[must_use]
    pub fn served(&self) -> Vec<RequestSpec> {
        self.served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests served so far.
    #[must_use]
    pub fn served_count(&self) -> usize {
        self.served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of served requests matching a method and literal route.
    #[must_use]
    pub fn served_count_for(&self, method: Method, route: &str) -> usize {
        self.served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|request| request.method == method && request.route == route)
            .count()
    }

    fn find_route(&self, method: Method, route: &str) -> Option<(&MockRoute, HashMap<String, String>)> {
        self.routes.iter().find_map(|candidate| {
            if candidate.method != method {
                return None;
            }
            match_segments(&candidate.pattern, route).map(|params| (candidate, params))
        })
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn call(&self, request: RequestSpec) -> TransportFuture<'_> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.served
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());

            let Some((route, params)) = self.find_route(request.method, &request.route) else {
                return Err(TransportError::not_found(request.route));
            };
            (route.handler)(MockRequest {
                method: request.method,
                route: request.route,
                params,
                payload: request.payload,
            })
        })
    }
}
