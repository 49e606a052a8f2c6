//! # Refetch Testing
//!
//! Testing utilities and mock transports for Refetch.
//!
//! This crate provides:
//! - [`MockTransport`]: an in-process route table standing in for a backend
//! - Tracing setup helpers for tests and demos
//!
//! ## Example
//!
//! ```ignore
//! use refetch_testing::MockTransport;
//! use refetch_core::Method;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn update_patches_cached_list() {
//!     let transport = Arc::new(
//!         MockTransport::new()
//!             .route(Method::Get, "/notes", |_| Ok(json!([])))
//!             .route(Method::Put, "/notes/:id", |req| {
//!                 Ok(req.payload.unwrap_or(json!(null)))
//!             }),
//!     );
//!     let dispatcher = Dispatcher::builder(transport.clone())
//!         .with_factory(&note_list)
//!         .build();
//!     // ... dispatch and assert on transport.served()
//! }
//! ```

/// In-process mock transport
pub mod transport;

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Initialize tracing for a test or demo binary.
    ///
    /// Respects `RUST_LOG`; defaults to `info` when unset. Safe to call from
    /// every test: repeated initialization attempts are ignored.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::init_test_tracing;
pub use transport::{MockHandler, MockRequest, MockTransport};
