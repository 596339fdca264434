//! Registry of monitored IO points.

use super::point::{Direction, IoPoint};
use crate::bus::{BusConnection, BusError, BusMessage, DeviceLink, ALL_DEVICES, DEVICE_ROOT};
use crate::notifier::{NotificationLevel, Notifier};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

const IO_EXPANDER: &str = "io-expander";
const AVAILABLE: &str = "available";

/// Mirrors the value of named IO points from device bus events and reports
/// every change to observers as an IO_STATE event.
#[derive(Debug)]
pub struct IoMonitor {
    points: Mutex<Vec<IoPoint>>,
    notifier: Notifier,
}

impl IoMonitor {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            points: Mutex::new(Vec::new()),
            notifier,
        }
    }

    /// Start tracking a point under `name`.
    ///
    /// Returns `false` if the name is taken. The same physical point may be
    /// monitored under several names; only the first registered entry is
    /// updated by bus events.
    pub fn start_monitoring(
        &self,
        name: impl Into<String>,
        direction: Direction,
        device: u32,
        pin: u32,
    ) -> bool {
        let name = name.into();
        let mut points = self.table();
        if points.iter().any(|point| point.name == name) {
            warn!(%name, "IO point name already monitored");
            return false;
        }
        debug!(%name, ?direction, device, pin, "Monitoring IO point");
        points.push(IoPoint::new(name, direction, device, pin));
        true
    }

    /// Stop tracking `name`. Returns `false` if it was not monitored.
    pub fn stop_monitoring(&self, name: &str) -> bool {
        let mut points = self.table();
        match points.iter().position(|point| point.name == name) {
            Some(index) => {
                points.remove(index);
                true
            }
            None => false,
        }
    }

    /// Apply one device bus event. The payload is stored verbatim as the
    /// point's value.
    ///
    /// Returns the updated point, or `None` if the event is not a digital
    /// IO value or no monitored point matches it.
    pub fn handle_message(&self, topic: &str, payload: &str) -> Option<IoPoint> {
        let (direction, device, pin) = parse_io_topic(topic)?;
        let value = Value::String(payload.to_string());

        let updated = {
            let mut points = self.table();
            let point = points
                .iter_mut()
                .find(|point| point.is_at(direction, device, pin))?;
            point.value = value;
            point.clone()
        };

        trace!(name = %updated.name, value = %updated.value, "IO point changed");
        self.notifier
            .send_message(NotificationLevel::IoState, "", Some(updated.snapshot()));
        Some(updated)
    }

    /// Subscribe to every device topic on `link` and feed the events to this
    /// monitor. Monitoring lasts as long as the returned connection is open.
    pub fn attach(self: &Arc<Self>, link: &dyn DeviceLink) -> Result<Box<dyn BusConnection>, BusError> {
        let mut connection = link.open()?;
        let monitor = Arc::clone(self);
        connection.subscribe(
            ALL_DEVICES,
            Arc::new(move |message: BusMessage| {
                monitor.handle_message(&message.topic, &message.payload);
            }),
        )?;
        debug!(device = link.identity(), "IO monitor attached");
        Ok(connection)
    }

    pub fn point(&self, name: &str) -> Option<IoPoint> {
        self.table().iter().find(|point| point.name == name).cloned()
    }

    /// Every monitored point in registration order.
    pub fn points(&self) -> Vec<IoPoint> {
        self.table().clone()
    }

    fn table(&self) -> MutexGuard<'_, Vec<IoPoint>> {
        self.points.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Split `devices/io-expander/<device>/<signal>/<pin>`.
fn parse_io_topic(topic: &str) -> Option<(Direction, u32, u32)> {
    let mut parts = topic.split('/');
    if parts.next()? != DEVICE_ROOT || parts.next()? != IO_EXPANDER {
        return None;
    }
    let device = parts.next()?;
    let signal = parts.next()?;
    if signal == AVAILABLE {
        return None;
    }
    let direction = Direction::from_signal(signal)?;
    let pin = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((direction, device.parse().ok()?, pin.parse().ok()?))
}
