//! Context handed to every state hook.

use crate::bus::{BusError, BusMessage, DeviceLink, SubscriptionSet};
use crate::engine::EngineHandle;
use crate::notifier::{NotificationLevel, Notifier};
use serde_json::Value;

/// Everything a state may touch while one of its hooks runs.
///
/// The context borrows the state's own subscription set, so callbacks
/// registered here belong to the state and are released by the engine when
/// the state is left.
pub struct StateContext<'a> {
    name: &'a str,
    control: &'a EngineHandle,
    notifier: &'a Notifier,
    configuration: &'a Value,
    subscriptions: &'a mut SubscriptionSet,
}

impl<'a> StateContext<'a> {
    pub fn new(
        name: &'a str,
        control: &'a EngineHandle,
        notifier: &'a Notifier,
        configuration: &'a Value,
        subscriptions: &'a mut SubscriptionSet,
    ) -> Self {
        Self {
            name,
            control,
            notifier,
            configuration,
            subscriptions,
        }
    }

    /// Name of the state whose hook is running.
    pub fn state_name(&self) -> &str {
        self.name
    }

    /// Request a transition to `state` at the next loop boundary.
    ///
    /// Returns `false` (and logs) if no state with that name exists.
    pub fn goto_state(&self, state: &str) -> bool {
        self.control.request_transition(state)
    }

    /// Register `callback` for `topic` on `device`.
    ///
    /// The first registration for a device opens one bridge for it; later
    /// registrations for the same device identity reuse that bridge.
    /// Callbacks run on the engine thread, before `update`, in the order they
    /// were registered.
    pub fn register_callback<F>(
        &mut self,
        device: &dyn DeviceLink,
        topic: &str,
        callback: F,
    ) -> Result<(), BusError>
    where
        F: FnMut(&BusMessage) -> anyhow::Result<()> + Send + 'static,
    {
        self.subscriptions.register_callback(device, topic, callback)
    }

    /// Queue a status line for every connected observer.
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.notifier.send_message(level, message, None);
    }

    pub fn notifier(&self) -> &Notifier {
        self.notifier
    }

    /// Configuration passed to [`Engine::start`](crate::engine::Engine::start).
    pub fn configuration(&self) -> &Value {
        self.configuration
    }

    pub fn engine(&self) -> &EngineHandle {
        self.control
    }
}
