//! Fetch factories for the notes app.
//!
//! Three namespaces cover the whole app:
//!
//! - `noteList`: the full collection, fetched once and kept fresh by merges
//! - `noteItem`: individual notes; get, update, and delete of one id share a
//!   single cache entry
//! - `newNoteItem`: creation, a namespace of its own so the list can tell
//!   "append this" apart from "replace this"
//!
//! The list factory declares both merge rules, so dispatching any item or
//! creation fetch keeps every cached list current without a refetch.

use refetch_core::{FetchDescriptor, FetchFactory, FetchKey, Namespace, RequestSpec};
use refetch_runtime::DispatcherBuilder;
use serde_json::{Value, json};

/// Namespace of the whole note collection.
pub const NOTE_LIST: Namespace = Namespace::new("noteList");
/// Namespace of individual notes.
pub const NOTE_ITEM: Namespace = Namespace::new("noteItem");
/// Namespace of note creation.
pub const NEW_NOTE_ITEM: Namespace = Namespace::new("newNoteItem");

/// Merge a settled note item into the cached list.
///
/// Declines when the list has no data yet or does not contain the note's id.
/// A tombstone (`{id, deleted: true}`) removes the note; anything else
/// replaces it in place.
#[must_use]
pub fn merge_note_item(current: Option<&Value>, item: &Value) -> Option<Value> {
    let list = current?.as_array()?;
    let id = item.get("id")?;
    let index = list.iter().position(|note| note.get("id") == Some(id))?;

    let mut next = list.clone();
    if item.get("deleted").and_then(Value::as_bool).unwrap_or(false) {
        next.retain(|note| note.get("id") != Some(id));
    } else {
        *next.get_mut(index)? = item.clone();
    }
    Some(Value::Array(next))
}

/// Append a freshly created note to the cached list.
///
/// Declines when the list has no data yet; a list that was never fetched
/// stays absent.
#[must_use]
pub fn merge_new_note(current: Option<&Value>, created: &Value) -> Option<Value> {
    let mut next = current?.as_array()?.clone();
    next.push(created.clone());
    Some(Value::Array(next))
}

/// The app's fetch factories, built once and registered together.
pub struct NoteFetches {
    /// `GET /notes`; merge target for item and creation commits.
    pub note_list: FetchFactory,
    /// `GET /notes/:id`.
    pub note_item: FetchFactory,
    /// `PUT /notes/:id`, carrying the full replacement note.
    pub update_note: FetchFactory,
    /// `DELETE /notes/:id`; the response is reshaped into a tombstone.
    pub delete_note: FetchFactory,
    /// `POST /notes`; the server assigns the id.
    pub create_note: FetchFactory,
}

impl NoteFetches {
    /// Build the factories.
    #[must_use]
    pub fn new() -> Self {
        let note_list =
            FetchFactory::new("Get Note List", NOTE_LIST, |_, _| RequestSpec::get("/notes"))
                .with_merge(NOTE_ITEM, merge_note_item)
                .with_merge(NEW_NOTE_ITEM, merge_new_note);

        let note_item = FetchFactory::new("Get Note Item", NOTE_ITEM, |key, _| {
            RequestSpec::get(format!("/notes/{key}"))
        });

        let update_note = FetchFactory::new("Update Note Item", NOTE_ITEM, |key, args| {
            RequestSpec::put(format!("/notes/{key}"), args.cloned())
        });

        // The server returns no body for a delete, so the settled value is a
        // tombstone the list merge understands.
        let delete_note = FetchFactory::new("Delete Note Item", NOTE_ITEM, |key, _| {
            RequestSpec::delete(format!("/notes/{key}"))
        })
        .with_transform(|key, _| json!({ "id": key.to_string(), "deleted": true }));

        let create_note = FetchFactory::new("Create Note Item", NEW_NOTE_ITEM, |_, args| {
            RequestSpec::post("/notes", args.cloned())
        });

        Self {
            note_list,
            note_item,
            update_note,
            delete_note,
            create_note,
        }
    }

    /// Register every factory on a dispatcher builder.
    #[must_use]
    pub fn install(&self, builder: DispatcherBuilder) -> DispatcherBuilder {
        builder
            .with_factory(&self.note_list)
            .with_factory(&self.note_item)
            .with_factory(&self.update_note)
            .with_factory(&self.delete_note)
            .with_factory(&self.create_note)
    }

    /// Descriptor for the whole collection.
    #[must_use]
    pub fn list(&self) -> FetchDescriptor {
        self.note_list.make(FetchKey::root())
    }

    /// Descriptor reading one note.
    #[must_use]
    pub fn item(&self, id: &str) -> FetchDescriptor {
        self.note_item.make(id)
    }

    /// Descriptor replacing one note.
    #[must_use]
    pub fn update(&self, id: &str) -> FetchDescriptor {
        self.update_note.make(id)
    }

    /// Descriptor deleting one note.
    #[must_use]
    pub fn delete(&self, id: &str) -> FetchDescriptor {
        self.delete_note.make(id)
    }

    /// Descriptor creating a note.
    #[must_use]
    pub fn create(&self) -> FetchDescriptor {
        self.create_note.make(FetchKey::root())
    }
}

impl Default for NoteFetches {
    fn default() -> Self {
        Self::new()
    }
}
