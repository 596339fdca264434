//! Broadcast service error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that can occur while starting the status broadcast service.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Invalid notifier settings: {0}")]
    Settings(#[from] ConfigError),

    #[error("Failed to bind observer socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build the notifier runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to spawn the notifier thread: {0}")]
    Thread(#[source] std::io::Error),
}
