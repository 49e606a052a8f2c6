//! In-process notes backend.
//!
//! [`NotesApi`] keeps the note collection behind a mutex and exposes it as a
//! [`MockTransport`] route table with CRUD semantics: unknown ids resolve
//! not-found, creation assigns server-side ids, and deletion returns an empty
//! body. The demo binary and the integration tests both run against it.

use crate::note::Note;
use chrono::Utc;
use refetch_core::{Method, TransportError};
use refetch_testing::{MockRequest, MockTransport};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// A fake notes backend over an in-memory collection.
///
/// Cloning shares the collection, which is how the route closures and the
/// test that seeded them observe the same state.
#[derive(Clone)]
pub struct NotesApi {
    notes: Arc<Mutex<Vec<Note>>>,
    ids: Arc<Mutex<VecDeque<String>>>,
}

impl NotesApi {
    /// A backend seeded with the given notes.
    #[must_use]
    pub fn new(seed: Vec<Note>) -> Self {
        Self {
            notes: Arc::new(Mutex::new(seed)),
            ids: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Preset the ids assigned to the next creations, in order.
    ///
    /// Creations beyond the presets fall back to random ids. Tests preset
    /// ids to keep assertions deterministic.
    #[must_use]
    pub fn with_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock_ids().extend(ids.into_iter().map(Into::into));
        self
    }

    /// The collection as the backend would serve it right now.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Note> {
        self.lock_notes().clone()
    }

    /// Build the transport serving this backend's routes.
    #[must_use]
    pub fn into_transport(self, latency: Duration) -> MockTransport {
        let list = self.clone();
        let create = self.clone();
        let get = self.clone();
        let update = self.clone();
        let delete = self;
        MockTransport::new()
            .with_latency(latency)
            .route(Method::Get, "/notes", move |_| list.serve_list())
            .route(Method::Post, "/notes", move |req| create.serve_create(req))
            .route(Method::Get, "/notes/:id", move |req| get.serve_get(&req))
            .route(Method::Put, "/notes/:id", move |req| update.serve_update(req))
            .route(Method::Delete, "/notes/:id", move |req| {
                delete.serve_delete(&req)
            })
    }

    fn lock_notes(&self) -> MutexGuard<'_, Vec<Note>> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_ids(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> String {
        self.lock_ids()
            .pop_front()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    fn serve_list(&self) -> Result<Value, TransportError> {
        serde_json::to_value(self.snapshot())
            .map_err(|e| TransportError::failed(e.to_string()))
    }

    fn serve_create(&self, req: MockRequest) -> Result<Value, TransportError> {
        let Some(Value::Object(mut fields)) = req.payload else {
            return Err(TransportError::failed("create requires an object payload"));
        };

        // The server owns the id; a timestamp is stamped only when the
        // client sent none.
        fields.insert("id".into(), json!(self.next_id()));
        fields
            .entry("updatedAt")
            .or_insert_with(|| json!(Utc::now()));

        let value = Value::Object(fields);
        let note: Note = serde_json::from_value(value.clone())
            .map_err(|e| TransportError::failed(e.to_string()))?;
        self.lock_notes().push(note);
        Ok(value)
    }

    fn serve_get(&self, req: &MockRequest) -> Result<Value, TransportError> {
        let id = req.param("id");
        let notes = self.lock_notes();
        let note = notes
            .iter()
            .find(|note| note.id == id)
            .ok_or_else(|| TransportError::not_found(req.route.clone()))?;
        serde_json::to_value(note).map_err(|e| TransportError::failed(e.to_string()))
    }

    fn serve_update(&self, req: MockRequest) -> Result<Value, TransportError> {
        let id = req.param("id").to_string();
        let payload = req
            .payload
            .ok_or_else(|| TransportError::failed("update requires a payload"))?;
        let note: Note = serde_json::from_value(payload.clone())
            .map_err(|e| TransportError::failed(e.to_string()))?;

        let mut notes = self.lock_notes();
        let index = notes
            .iter()
            .position(|note| note.id == id)
            .ok_or_else(|| TransportError::not_found(format!("/notes/{id}")))?;
        // Stored verbatim: the replacement is whatever the client sent.
        notes[index] = note;
        Ok(payload)
    }

    fn serve_delete(&self, req: &MockRequest) -> Result<Value, TransportError> {
        let id = req.param("id");
        let mut notes = self.lock_notes();
        if !notes.iter().any(|note| note.id == id) {
            return Err(TransportError::not_found(req.route.clone()));
        }
        notes.retain(|note| note.id != id);
        // No body; the delete fetch synthesizes its own tombstone.
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refetch_core::{RequestSpec, Transport};

    fn seed() -> Vec<Note> {
        vec![Note::new("a", "# A"), Note::new("b", "# B")]
    }

    #[tokio::test]
    async fn test_list_serves_the_collection() {
        let transport = NotesApi::new(seed()).into_transport(Duration::ZERO);

        let body = transport.call(RequestSpec::get("/notes")).await;
        let notes: Vec<Note> = match body {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(error) => unreachable!("list failed: {error}"),
        };
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "a");
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let transport = NotesApi::new(seed()).into_transport(Duration::ZERO);

        let body = transport.call(RequestSpec::get("/notes/zz")).await;
        assert_eq!(body, Err(TransportError::not_found("/notes/zz")));

        let body = transport.call(RequestSpec::delete("/notes/zz")).await;
        assert_eq!(body, Err(TransportError::not_found("/notes/zz")));
    }

    #[tokio::test]
    async fn test_create_assigns_preset_ids_then_random() {
        let api = NotesApi::new(Vec::new()).with_ids(["b"]);
        let backend = api.clone();
        let transport = api.into_transport(Duration::ZERO);

        let first = transport
            .call(RequestSpec::post(
                "/notes",
                Some(json!({ "content": "# B" })),
            ))
            .await;
        assert_eq!(
            first.as_ref().ok().and_then(|v| v.get("id")),
            Some(&json!("b"))
        );

        let second = transport
            .call(RequestSpec::post(
                "/notes",
                Some(json!({ "content": "# C" })),
            ))
            .await;
        let second_id = second
            .as_ref()
            .ok()
            .and_then(|v| v.get("id"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        assert_ne!(second_id, "b");
        assert!(!second_id.is_empty());

        assert_eq!(backend.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_and_delete_removes() {
        let api = NotesApi::new(seed());
        let backend = api.clone();
        let transport = api.into_transport(Duration::ZERO);

        let replacement = serde_json::to_value(Note::new("a", "# A2")).unwrap_or_default();
        let updated = transport
            .call(RequestSpec::put("/notes/a", Some(replacement.clone())))
            .await;
        assert_eq!(updated, Ok(replacement));
        assert_eq!(backend.snapshot()[0].content, "# A2");

        let deleted = transport.call(RequestSpec::delete("/notes/a")).await;
        assert_eq!(deleted, Ok(Value::Null));
        let remaining: Vec<String> = backend.snapshot().iter().map(|n| n.id.clone()).collect();
        assert_eq!(remaining, vec!["b"]);
    }
}
