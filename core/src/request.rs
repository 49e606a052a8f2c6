//! Request descriptions produced by fetch factories.
//!
//! A [`RequestSpec`] is the declarative output of a fetch's request builder:
//! an HTTP-shaped method, a route string, and an optional JSON payload. It
//! carries no connection details; interpreting the route is the transport's
//! job.

use serde_json::Value;
use std::fmt;

/// Request method, HTTP-shaped.
///
/// The four CRUD verbs are all the dispatch pipeline needs; transports map
/// them onto whatever protocol they speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a resource.
    Get,
    /// Create a resource.
    Post,
    /// Replace a resource.
    Put,
    /// Remove a resource.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A single request to hand to a [`Transport`](crate::transport::Transport).
///
/// Built by a fetch factory's request function from the fetch key and any
/// dispatch arguments. The payload is optional because read and delete
/// requests carry none.
///
/// # Example
///
/// ```
/// use refetch_core::request::{Method, RequestSpec};
/// use serde_json::json;
///
/// let read = RequestSpec::get("/notes/42");
/// assert_eq!(read.method, Method::Get);
/// assert!(read.payload.is_none());
///
/// let write = RequestSpec::put("/notes/42", Some(json!({ "content": "updated" })));
/// assert_eq!(write.method, Method::Put);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// Request verb.
    pub method: Method,
    /// Route the transport should resolve, e.g. `/notes/42`.
    pub route: String,
    /// Optional JSON body.
    pub payload: Option<Value>,
}

impl RequestSpec {
    /// Build a `GET` request for a route.
    #[must_use]
    pub fn get(route: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            route: route.into(),
            payload: None,
        }
    }

    /// Build a `POST` request with an optional payload.
    #[must_use]
    pub fn post(route: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            route: route.into(),
            payload,
        }
    }

    /// Build a `PUT` request with an optional payload.
    #[must_use]
    pub fn put(route: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            method: Method::Put,
            route: route.into(),
            payload,
        }
    }

    /// Build a `DELETE` request for a route.
    #[must_use]
    pub fn delete(route: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            route: route.into(),
            payload: None,
        }
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_set_method_and_route() {
        assert_eq!(RequestSpec::get("/notes").method, Method::Get);
        assert_eq!(RequestSpec::delete("/notes/1").route, "/notes/1");
    }

    #[test]
    fn write_requests_carry_payloads() {
        let spec = RequestSpec::post("/notes", Some(json!({ "content": "hi" })));
        assert_eq!(spec.payload, Some(json!({ "content": "hi" })));
    }

    #[test]
    fn display_reads_like_a_request_line() {
        assert_eq!(RequestSpec::put("/notes/7", None).to_string(), "PUT /notes/7");
    }
}
