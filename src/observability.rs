//! Logging setup.
//!
//! Library code only emits `tracing` events. Binaries call
//! [`init_tracing`] once at startup to print them.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a formatted `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once (or after another subscriber was installed) has no effect.
///
/// # Example
///
/// ```rust
/// use machineapp::config::LoggingConfig;
/// use machineapp::observability::init_tracing;
///
/// init_tracing(&LoggingConfig::default());
/// tracing::info!("machine app starting");
/// ```
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(true);

    // Ignore the error if a global subscriber is already set
    let _ = subscriber.try_init();
}
