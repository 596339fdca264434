//! In-memory device bus.
//!
//! `LocalBus` implements the transport contract inside the process. It is
//! used by tests and demos, and by deployments where the device events are
//! produced in-process (simulators, replay tools).

use super::{topic_matches, BusConnection, BusError, BusMessage, DeviceLink, MessageHandler};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

struct Route {
    connection: u64,
    filter: String,
    handler: MessageHandler,
}

#[derive(Default)]
struct Broker {
    next_connection: u64,
    routes: Vec<Route>,
}

/// In-process publish/subscribe broker.
///
/// Cloning a `LocalBus` yields another handle to the same broker.
#[derive(Clone, Default)]
pub struct LocalBus {
    broker: Arc<Mutex<Broker>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose connections go through this broker.
    pub fn device(&self, identity: impl Into<String>) -> LocalDevice {
        LocalDevice {
            identity: identity.into(),
            bus: self.clone(),
        }
    }

    /// Deliver a message to every matching subscription on the calling
    /// thread. Returns the number of handlers invoked.
    pub fn publish(&self, topic: &str, payload: impl Into<String>) -> usize {
        let payload = payload.into();
        let handlers: Vec<MessageHandler> = self
            .broker()
            .routes
            .iter()
            .filter(|route| topic_matches(&route.filter, topic))
            .map(|route| Arc::clone(&route.handler))
            .collect();

        trace!(topic, receivers = handlers.len(), "Publishing on local bus");
        for handler in &handlers {
            handler(BusMessage::new(topic, payload.clone()));
        }
        handlers.len()
    }

    /// Number of live subscriptions across all connections.
    pub fn subscription_count(&self) -> usize {
        self.broker().routes.len()
    }

    fn broker(&self) -> MutexGuard<'_, Broker> {
        self.broker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A device attached to a [`LocalBus`].
#[derive(Clone)]
pub struct LocalDevice {
    identity: String,
    bus: LocalBus,
}

impl DeviceLink for LocalDevice {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn open(&self) -> Result<Box<dyn BusConnection>, BusError> {
        let id = {
            let mut broker = self.bus.broker();
            broker.next_connection += 1;
            broker.next_connection
        };
        Ok(Box::new(LocalConnection {
            id,
            bus: self.bus.clone(),
            closed: false,
        }))
    }
}

struct LocalConnection {
    id: u64,
    bus: LocalBus,
    closed: bool,
}

impl BusConnection for LocalConnection {
    fn subscribe(&mut self, filter: &str, handler: MessageHandler) -> Result<(), BusError> {
        if self.closed {
            return Err(BusError::Closed);
        }
        self.bus.broker().routes.push(Route {
            connection: self.id,
            filter: filter.to_string(),
            handler,
        });
        Ok(())
    }

    fn unsubscribe(&mut self, filter: &str) -> Result<(), BusError> {
        if self.closed {
            return Err(BusError::Closed);
        }
        let id = self.id;
        self.bus
            .broker()
            .routes
            .retain(|route| !(route.connection == id && route.filter == filter));
        Ok(())
    }

    fn close(&mut self) {
        let id = self.id;
        self.bus.broker().routes.retain(|route| route.connection != id);
        self.closed = true;
    }
}
