//! Transport error types.

use thiserror::Error;

/// Errors reported by a publish/subscribe transport.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Could not open a bus connection to device '{device}': {reason}")]
    Connect { device: String, reason: String },

    #[error("Could not subscribe to '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("Could not unsubscribe from '{topic}': {reason}")]
    Unsubscribe { topic: String, reason: String },

    #[error("Bus connection is closed")]
    Closed,
}
