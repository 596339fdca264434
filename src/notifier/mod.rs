//! Status broadcast service.
//!
//! Any component can queue a [`StatusEvent`]; a background thread pushes
//! queued events to every connected websocket observer as JSON text
//! frames. Observers are passive and never see events from before they
//! connected.

mod error;
mod event;
mod global;
mod server;
mod service;

pub use error::NotifierError;
pub use event::{NotificationLevel, StatusEvent};
pub use global::{initialize_notifier, notifier, send_notification};
pub use service::{Notifier, DETACHED_CAPACITY};
