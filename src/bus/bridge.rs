//! Per-device subscription bridges.

use super::{BusConnection, BusError, BusMessage, DeviceLink, MessageHandler};
use async_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Callback registered for a topic on a bridge.
pub type Callback = Box<dyn FnMut(&BusMessage) -> anyhow::Result<()> + Send>;

/// Subscribes to topics on one device connection and dispatches inbound
/// messages to registered callbacks.
///
/// Transports deliver messages on their own thread; the bridge queues them
/// and [`dispatch`](EventBridge::dispatch) fires the callbacks on the
/// caller's thread. Dropping a bridge releases it.
pub struct EventBridge {
    device: String,
    connection: Option<Box<dyn BusConnection>>,
    callbacks: HashMap<String, Vec<Callback>>,
    inbox_tx: Sender<(String, BusMessage)>,
    inbox: Receiver<(String, BusMessage)>,
}

impl EventBridge {
    /// Open a connection to `link` and wrap it in an empty bridge.
    pub fn open(link: &dyn DeviceLink) -> Result<Self, BusError> {
        let connection = link.open()?;
        let (inbox_tx, inbox) = async_channel::unbounded();
        debug!(device = link.identity(), "Opened event bridge");
        Ok(Self {
            device: link.identity().to_string(),
            connection: Some(connection),
            callbacks: HashMap::new(),
            inbox_tx,
            inbox,
        })
    }

    pub fn device_identity(&self) -> &str {
        &self.device
    }

    /// Add `callback` for `topic`.
    ///
    /// Registration is additive: registering the same topic twice keeps
    /// both callbacks. The transport subscription is made once per topic.
    pub fn register<F>(&mut self, topic: &str, callback: F) -> Result<(), BusError>
    where
        F: FnMut(&BusMessage) -> anyhow::Result<()> + Send + 'static,
    {
        if !self.callbacks.contains_key(topic) {
            let connection = self.connection.as_mut().ok_or(BusError::Closed)?;
            let inbox = self.inbox_tx.clone();
            let key = topic.to_string();
            let handler: MessageHandler = Arc::new(move |message: BusMessage| {
                if inbox.try_send((key.clone(), message)).is_err() {
                    trace!(topic = %key, "Bridge inbox closed, dropping message");
                }
            });
            connection.subscribe(topic, handler)?;
        }

        self.callbacks
            .entry(topic.to_string())
            .or_default()
            .push(Box::new(callback));
        Ok(())
    }

    /// Fire callbacks for every queued message.
    ///
    /// Callbacks for a topic run in registration order. A callback that
    /// fails or panics is logged and skipped; its siblings still run.
    /// Returns the number of messages dispatched.
    pub fn dispatch(&mut self) -> usize {
        let mut dispatched = 0;
        while let Ok((topic, message)) = self.inbox.try_recv() {
            dispatched += 1;
            let Some(callbacks) = self.callbacks.get_mut(&topic) else {
                continue;
            };
            for (index, callback) in callbacks.iter_mut().enumerate() {
                match panic::catch_unwind(AssertUnwindSafe(|| callback(&message))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => warn!(
                        device = %self.device,
                        topic = %message.topic,
                        callback = index,
                        "Bus callback failed: {err:#}"
                    ),
                    Err(_) => error!(
                        device = %self.device,
                        topic = %message.topic,
                        callback = index,
                        "Bus callback panicked"
                    ),
                }
            }
        }
        dispatched
    }

    /// Unsubscribe every topic and close the connection. Idempotent.
    pub fn release(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        for topic in self.callbacks.keys() {
            if let Err(err) = connection.unsubscribe(topic) {
                warn!(device = %self.device, "Failed to unsubscribe: {err}");
            }
        }
        connection.close();
        self.callbacks.clear();
        while self.inbox.try_recv().is_ok() {}
        debug!(device = %self.device, "Released event bridge");
    }

    pub fn is_released(&self) -> bool {
        self.connection.is_none()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.callbacks.keys().map(String::as_str)
    }

    pub fn callback_count(&self, topic: &str) -> usize {
        self.callbacks.get(topic).map_or(0, Vec::len)
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.release();
    }
}

/// The bridges owned by one state, at most one per device identity.
#[derive(Default)]
pub struct SubscriptionSet {
    bridges: Vec<EventBridge>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `topic` on the bridge for `device`, opening
    /// that bridge on first use.
    pub fn register_callback<F>(
        &mut self,
        device: &dyn DeviceLink,
        topic: &str,
        callback: F,
    ) -> Result<(), BusError>
    where
        F: FnMut(&BusMessage) -> anyhow::Result<()> + Send + 'static,
    {
        let index = match self
            .bridges
            .iter()
            .position(|bridge| bridge.device_identity() == device.identity())
        {
            Some(index) => index,
            None => {
                self.bridges.push(EventBridge::open(device)?);
                self.bridges.len() - 1
            }
        };
        self.bridges[index].register(topic, callback)
    }

    /// Dispatch queued messages on every bridge.
    pub fn dispatch(&mut self) -> usize {
        self.bridges.iter_mut().map(EventBridge::dispatch).sum()
    }

    /// Release and drop every bridge.
    pub fn release(&mut self) {
        for bridge in &mut self.bridges {
            bridge.release();
        }
        self.bridges.clear();
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    pub fn bridges(&self) -> &[EventBridge] {
        &self.bridges
    }
}
