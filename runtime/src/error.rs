//! Error types for the store runtime.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Transport failures are not in here: a failed request is a normal outcome
/// that settles into the dispatching cache entry (and is returned by the
/// dispatch call), not a store malfunction.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A cached value could not be deserialized into the requested type.
    ///
    /// Raised by typed selectors when the JSON in the cache does not match
    /// the consumer's expected shape.
    #[error("Failed to deserialize cached value: {reason}")]
    Deserialize {
        /// Serde's description of the mismatch.
        reason: String,
    },

    /// The change broadcast channel closed.
    ///
    /// Returned by subscriptions when the store they watch has been dropped.
    #[error("Change broadcast channel closed")]
    ChannelClosed,
}
