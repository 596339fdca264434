//! The broadcast hub shared by every producer.

use super::error::NotifierError;
use super::event::{NotificationLevel, StatusEvent};
use super::server;
use crate::config::NotifierSettings;
use async_channel::Sender;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info, trace};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Events a [`Notifier::detached`] queue holds before dropping the oldest.
pub const DETACHED_CAPACITY: usize = 4096;

/// State shared between producers and the server thread.
pub(crate) struct Shared {
    queue: Mutex<VecDeque<StatusEvent>>,
    capacity: Option<usize>,
    alive: AtomicBool,
    observers: Mutex<HashMap<Uuid, Sender<String>>>,
    local_addr: OnceLock<SocketAddr>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self::with_capacity(None)
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity,
            alive: AtomicBool::new(true),
            observers: Mutex::new(HashMap::new()),
            local_addr: OnceLock::new(),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn push(&self, event: StatusEvent) {
        let mut queue = lock(&self.queue);
        if let Some(capacity) = self.capacity {
            if queue.len() >= capacity {
                if let Some(oldest) = queue.pop_front() {
                    debug!(level = ?oldest.level, "Status queue full, dropping oldest event");
                }
            }
        }
        queue.push_back(event);
    }

    /// Copy and clear the queue in one critical section.
    pub(crate) fn take_queue(&self) -> Vec<StatusEvent> {
        Vec::from(std::mem::take(&mut *lock(&self.queue)))
    }

    pub(crate) fn add_observer(&self, id: Uuid, outbound: Sender<String>) {
        lock(&self.observers).insert(id, outbound);
    }

    pub(crate) fn remove_observer(&self, id: &Uuid) {
        lock(&self.observers).remove(id);
    }

    pub(crate) fn clear_observers(&self) {
        lock(&self.observers).clear();
    }

    pub(crate) fn observers(&self) -> Vec<(Uuid, Sender<String>)> {
        lock(&self.observers)
            .iter()
            .map(|(id, outbound)| (*id, outbound.clone()))
            .collect()
    }
}

/// Handle to the status broadcast service.
///
/// Producers call [`send_message`](Notifier::send_message), which only
/// appends to a queue. A dedicated thread drains the queue at a fixed
/// interval and fans each event out to every connected websocket observer.
/// Delivery is fire-and-forget: observers that connect later never see
/// earlier events.
///
/// Cloning a `Notifier` yields another handle to the same service.
#[derive(Clone)]
pub struct Notifier {
    shared: Arc<Shared>,
}

impl Notifier {
    /// Bind the observer socket and start the drain thread.
    pub fn start(settings: NotifierSettings) -> Result<Self, NotifierError> {
        settings.validate()?;
        let shared = Arc::new(Shared::new());
        let addr = server::spawn(Arc::clone(&shared), &settings)?;
        let _ = shared.local_addr.set(addr);
        info!("Running the socket API on {addr}");
        Ok(Self { shared })
    }

    /// A notifier without a server.
    ///
    /// Events accumulate until the owner calls [`drain`](Notifier::drain)
    /// or [`set_dead`](Notifier::set_dead). At most [`DETACHED_CAPACITY`]
    /// events are kept; older ones are dropped first.
    pub fn detached() -> Self {
        Self {
            shared: Arc::new(Shared::with_capacity(Some(DETACHED_CAPACITY))),
        }
    }

    /// Queue an event for every connected observer. Never blocks on I/O.
    pub fn send_message(
        &self,
        level: NotificationLevel,
        message: impl Into<String>,
        payload: Option<Value>,
    ) {
        if !self.shared.is_alive() {
            trace!(?level, "Notifier is dead, dropping event");
            return;
        }
        self.shared
            .push(StatusEvent::new(level, message, payload));
    }

    /// Stop the drain task and the observer listener. Later events are
    /// dropped.
    pub fn set_dead(&self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        lock(&self.shared.queue).clear();
        info!("Websocket server set to die");
    }

    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    /// Take every queued event, leaving the queue empty.
    pub fn drain(&self) -> Vec<StatusEvent> {
        self.shared.take_queue()
    }

    /// Number of events waiting for the next drain.
    pub fn pending(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    /// Address the observer socket is bound to, if a server is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.local_addr.get().copied()
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.shared.observers).len()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("alive", &self.is_alive())
            .field("local_addr", &self.local_addr())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drain_returns_events_in_order_and_clears_queue() {
        let notifier = Notifier::detached();
        notifier.send_message(NotificationLevel::Info, "first", None);
        notifier.send_message(NotificationLevel::Warning, "second", Some(json!({"code": 7})));

        let events = notifier.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "first");
        assert_eq!(events[1].level, NotificationLevel::Warning);
        assert_eq!(events[1].custom_payload, Some(json!({"code": 7})));
        assert_eq!(notifier.pending(), 0);
        assert!(notifier.drain().is_empty());
    }

    #[test]
    fn clones_share_one_queue() {
        let notifier = Notifier::detached();
        let producer = notifier.clone();

        let worker = std::thread::spawn(move || {
            for index in 0..50 {
                producer.send_message(NotificationLevel::Info, format!("line {index}"), None);
            }
        });
        worker.join().unwrap();

        assert_eq!(notifier.pending(), 50);
    }

    #[test]
    fn dead_notifier_drops_events() {
        let notifier = Notifier::detached();
        notifier.send_message(NotificationLevel::Info, "queued", None);
        notifier.set_dead();
        notifier.send_message(NotificationLevel::Info, "dropped", None);

        assert!(!notifier.is_alive());
        assert!(notifier.drain().is_empty());
    }

    #[test]
    fn undrained_detached_queue_keeps_the_newest_events() {
        let notifier = Notifier::detached();
        for index in 0..DETACHED_CAPACITY + 3 {
            notifier.send_message(NotificationLevel::Info, format!("{index}"), None);
        }

        assert_eq!(notifier.pending(), DETACHED_CAPACITY);
        let events = notifier.drain();
        assert_eq!(events[0].message, "3");
        assert_eq!(
            events.last().map(|event| event.message.clone()),
            Some(format!("{}", DETACHED_CAPACITY + 2))
        );
    }

    #[test]
    fn detached_notifier_has_no_socket() {
        let notifier = Notifier::detached();
        assert!(notifier.local_addr().is_none());
        assert_eq!(notifier.observer_count(), 0);
    }
}
