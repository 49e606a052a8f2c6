//! Metrics for observability and monitoring.
//!
//! This module records metrics for the dispatch pipeline:
//! - Dispatch counts and latency
//! - Merge propagation fan-out
//! - Store size and notification volume
//!
//! Metrics go through the `metrics` facade, so they are recorded against
//! whatever recorder the host application installs. Call
//! [`register_metrics`] once at startup to attach descriptions and units.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use std::time::Duration;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Register all metric descriptions.
///
/// Safe to call multiple times; later calls overwrite descriptions only.
pub fn register_metrics() {
    // Dispatch Metrics
    describe_counter!(
        "fetch_dispatches_total",
        "Total number of fetches dispatched"
    );
    describe_counter!(
        "fetch_dispatch_errors_total",
        "Total number of dispatches that settled with a transport error"
    );
    describe_histogram!(
        "fetch_dispatch_duration_seconds",
        "Time from dispatch to settled commit"
    );

    // Merge Metrics
    describe_counter!(
        "merge_writes_total",
        "Total number of entries rewritten by merge rules"
    );
    describe_counter!(
        "merge_skips_total",
        "Total number of merge rule evaluations that declined to change the target"
    );

    // Store Metrics
    describe_gauge!(
        "store_entries",
        "Number of identities currently held in the cache"
    );
    describe_counter!(
        "store_notifications_total",
        "Total number of change notifications published"
    );
}

/// Dispatch pipeline metrics recorder.
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a dispatched fetch settling successfully.
    pub fn record_success(duration: Duration) {
        counter!("fetch_dispatches_total").increment(1);
        histogram!("fetch_dispatch_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a dispatched fetch settling with a transport error.
    pub fn record_error(duration: Duration) {
        counter!("fetch_dispatches_total").increment(1);
        counter!("fetch_dispatch_errors_total").increment(1);
        histogram!("fetch_dispatch_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Merge engine metrics recorder.
pub struct MergeMetrics;

impl MergeMetrics {
    /// Record one propagation pass: how many entries were rewritten and how
    /// many rule evaluations were no-ops.
    pub fn record_propagation(writes: usize, skips: usize) {
        if writes > 0 {
            counter!("merge_writes_total").increment(writes as u64);
        }
        if skips > 0 {
            counter!("merge_skips_total").increment(skips as u64);
        }
    }
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record the current number of cached identities.
    pub fn record_entries(count: usize) {
        // Note: Precision loss acceptable for a size gauge (entry counts < 2^52)
        #[allow(clippy::cast_precision_loss)]
        gauge!("store_entries").set(count as f64);
    }

    /// Record a published change notification.
    pub fn record_notification() {
        counter!("store_notifications_total").increment(1);
    }
}
