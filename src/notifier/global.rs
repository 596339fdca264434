//! Process-wide notifier.

use super::{NotificationLevel, Notifier};
use crate::config::NotifierSettings;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::error;

static GLOBAL: OnceLock<Notifier> = OnceLock::new();

/// Start the process-wide notifier with `settings`.
///
/// Returns `false` if a notifier was already initialized; the existing one
/// is kept. If the server cannot start, the global notifier is installed in
/// the dead state so producers keep working.
pub fn initialize_notifier(settings: NotifierSettings) -> bool {
    let mut installed = false;
    GLOBAL.get_or_init(|| {
        installed = true;
        start_or_dead(settings)
    });
    if !installed {
        error!("Notifier was already initialized.");
    }
    installed
}

/// The process-wide notifier, started with default settings on first use.
pub fn notifier() -> &'static Notifier {
    GLOBAL.get_or_init(|| start_or_dead(NotifierSettings::default()))
}

/// Queue an event on the process-wide notifier.
pub fn send_notification(level: NotificationLevel, message: impl Into<String>, payload: Option<Value>) {
    notifier().send_message(level, message, payload);
}

fn start_or_dead(settings: NotifierSettings) -> Notifier {
    match Notifier::start(settings) {
        Ok(notifier) => notifier,
        Err(err) => {
            error!("Failed to start notifier: {err}");
            let notifier = Notifier::detached();
            notifier.set_dead();
            notifier
        }
    }
}
