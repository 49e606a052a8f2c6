//! Notes example binary
//!
//! Walks the notes CRUD flow end to end against the mock backend, printing
//! what the cache holds after every dispatch. The point to watch for: the
//! list is fetched exactly once, and every later change reaches it through
//! merges.

use notes::{Note, NoteFetches, NotesApi};
use refetch_core::{FetchDescriptor, Method, Transport};
use refetch_runtime::{Dispatcher, Store, metrics};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LATENCY_MS: u64 = 250;

fn seed_notes() -> Vec<Note> {
    vec![
        Note::new(
            "intro",
            "# What is this app?\n\n\
             A CRUD walkthrough over five mock endpoints: list, create, get, \
             update, and delete. Each endpoint has a fetch factory in \
             `src/fetches.rs`.",
        ),
        Note::new(
            "shares",
            "# Shared fetches\n\n\
             Get, update, and delete of one note share a namespace and key, \
             so they read and write a single cache entry. Update a note and \
             the get is already fresh.",
        ),
        Note::new(
            "merges",
            "# Merges across namespaces\n\n\
             The list declares merge rules for item and creation commits. \
             Any settled item dispatch patches every cached list in place, \
             with no refetch.",
        ),
    ]
}

fn latency_from_env() -> Duration {
    let ms = std::env::var("NOTES_LATENCY_MS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_LATENCY_MS);
    Duration::from_millis(ms)
}

async fn print_list(store: &Store, list: &FetchDescriptor) {
    match store.data_as::<Vec<Note>>(list).await {
        Ok(Some(notes)) => {
            for note in &notes {
                println!("  • {} ({})", note.title(), note.id);
            }
        }
        Ok(None) => println!("  (no list cached)"),
        Err(error) => println!("  (list unreadable: {error})"),
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes=debug,refetch_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    metrics::register_metrics();

    println!("=== Notes Example: Shared Fetches and Merges ===\n");

    let latency = latency_from_env();
    let backend = NotesApi::new(seed_notes());
    let transport = Arc::new(backend.clone().into_transport(latency));
    let fetches = NoteFetches::new();
    let dispatcher = fetches
        .install(Dispatcher::builder(
            Arc::clone(&transport) as Arc<dyn Transport>
        ))
        .build();
    let store = dispatcher.store();
    let list = fetches.list();

    println!("Mock latency: {latency:?}");
    println!("List status before anything: {}", store.status(&list).await);

    // Load the list once; every later change reaches it through merges.
    println!("\n>>> Dispatching: Get Note List");
    let _ = dispatcher.dispatch(&list).await;
    println!("List status: {}", store.status(&list).await);
    print_list(store, &list).await;

    println!("\n>>> Dispatching: Get Note Item (intro)");
    let _ = dispatcher.dispatch(&fetches.item("intro")).await;
    let title = store
        .guard(&fetches.item("intro"), |data| {
            data.get("content")
                .and_then(Value::as_str)
                .unwrap_or("")
                .lines()
                .next()
                .unwrap_or("")
                .to_string()
        })
        .await;
    println!("Item entry now holds: {title:?}");

    println!("\n>>> Dispatching: Update Note Item (intro)");
    let payload = json!({
        "id": "intro",
        "content": "# What is this app? (edited)\n\nSame note, new content.",
        "updatedAt": chrono::Utc::now(),
    });
    let _ = dispatcher
        .dispatch_with(&fetches.update("intro"), payload)
        .await;
    println!("List after the update merge:");
    print_list(store, &list).await;
    println!(
        "List GETs served so far: {} (the merge did the rest)",
        transport.served_count_for(Method::Get, "/notes")
    );

    println!("\n>>> Dispatching: Create Note Item");
    let created_id = match dispatcher
        .dispatch_with(&fetches.create(), json!({ "content": "# Scratch pad" }))
        .await
    {
        Ok(created) => created
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Err(error) => {
            println!("Create failed: {error}");
            String::new()
        }
    };
    println!("Server assigned id: {created_id}");
    println!("List after the creation merge:");
    print_list(store, &list).await;

    println!("\n>>> Dispatching: Delete Note Item ({created_id})");
    let _ = dispatcher.dispatch(&fetches.delete(&created_id)).await;
    println!("List after the tombstone merge:");
    print_list(store, &list).await;

    println!("\n>>> Dispatching: Get Note Item (missing)");
    match dispatcher.dispatch(&fetches.item("missing")).await {
        Ok(_) => println!("Unexpectedly found a note"),
        Err(error) => {
            println!("Dispatch settled with error: {error}");
            println!("Treat as not-found: {}", error.is_not_found());
        }
    }
    println!(
        "Item status: {}",
        store.status(&fetches.item("missing")).await
    );

    println!("\n>>> Re-dispatching: Get Note List (watched)");
    let mut sub = store.watch(&list);
    let _ = dispatcher.dispatch(&list).await;
    for _ in 0..2 {
        if let Ok(change) = sub.changed().await {
            println!(
                "  change: {} (loading: {}, normal: {})",
                change.status,
                change.status.is_loading(),
                change.status.is_normal()
            );
        }
    }

    let cached = store
        .data_as::<Vec<Note>>(&list)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    println!(
        "\nServer holds {} notes, cache holds {}.",
        backend.snapshot().len(),
        cached.len()
    );

    println!("\n=== Walkthrough Complete ===");
    println!("\nKey concepts demonstrated:");
    println!("  • Fetch factories: one per endpoint, identity = namespace + key");
    println!("  • Shared entries: get/update/delete of a note read one cache slot");
    println!("  • Merge rules: item and creation commits patch cached lists in place");
    println!("  • Tombstones: deletes synthesize {{id, deleted}} for the list merge");
    println!("  • Status lifecycle: loading, refreshing (loading AND normal), error");
}
