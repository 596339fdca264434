//! Device event bus: transport contract, per-device bridges and an
//! in-memory broker.
//!
//! The runtime does not ship a network publish/subscribe client. Anything
//! that can hand out a [`BusConnection`] for a device (an MQTT client, a
//! serial gateway, the bundled [`LocalBus`]) plugs in through
//! [`DeviceLink`].
//!
//! # Key Concepts
//!
//! - **DeviceLink**: identity of a device plus a way to open a connection
//!   to its message bus
//! - **EventBridge**: one connection per device, topic → ordered callbacks,
//!   drained on the engine thread
//! - **SubscriptionSet**: the bridges owned by one state

mod bridge;
mod error;
mod local;
mod topic;

pub use bridge::{Callback, EventBridge, SubscriptionSet};
pub use error::BusError;
pub use local::{LocalBus, LocalDevice};
pub use topic::{io_topic, topic_matches, ALL_DEVICES, DEVICE_ROOT};

use std::sync::Arc;

/// A message received from the device bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Handler invoked by a transport for every message on a subscribed topic.
///
/// Transports may call handlers from any thread.
pub type MessageHandler = Arc<dyn Fn(BusMessage) + Send + Sync>;

/// A device whose message bus can be subscribed to.
pub trait DeviceLink: Send + Sync {
    /// Stable identity used to share one bridge per device.
    fn identity(&self) -> &str;

    /// Open a new connection to this device's bus.
    fn open(&self) -> Result<Box<dyn BusConnection>, BusError>;
}

/// One open connection to a device bus.
pub trait BusConnection: Send {
    /// Subscribe to `filter`; `handler` receives every matching message.
    fn subscribe(&mut self, filter: &str, handler: MessageHandler) -> Result<(), BusError>;

    fn unsubscribe(&mut self, filter: &str) -> Result<(), BusError>;

    /// Drop every subscription and release the connection.
    fn close(&mut self);
}
