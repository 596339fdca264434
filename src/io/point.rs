//! Monitored IO points.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Whether a point reads a digital input or mirrors a digital output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn is_input(self) -> bool {
        matches!(self, Self::Input)
    }

    /// Direction for a bus signal segment such as `digital-input`.
    pub fn from_signal(signal: &str) -> Option<Self> {
        match signal {
            "digital-input" => Some(Self::Input),
            "digital-output" => Some(Self::Output),
            _ => None,
        }
    }

    pub fn signal(self) -> &'static str {
        match self {
            Self::Input => "digital-input",
            Self::Output => "digital-output",
        }
    }
}

/// A named IO pin whose value is mirrored from the device bus.
#[derive(Clone, Debug, PartialEq)]
pub struct IoPoint {
    pub name: String,
    pub direction: Direction,
    pub device: u32,
    pub pin: u32,
    /// Last reported payload text, `0` until the first bus event
    pub value: Value,
}

impl IoPoint {
    pub fn new(name: impl Into<String>, direction: Direction, device: u32, pin: u32) -> Self {
        Self {
            name: name.into(),
            direction,
            device,
            pin,
            value: json!(0),
        }
    }

    pub fn is_at(&self, direction: Direction, device: u32, pin: u32) -> bool {
        self.direction == direction && self.device == device && self.pin == pin
    }

    /// Payload carried by IO_STATE events.
    pub fn snapshot(&self) -> Value {
        json!({
            "isInput": self.direction.is_input(),
            "name": self.name,
            "device": self.device,
            "pin": self.pin,
            "value": self.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_matches_wire_shape() {
        let point = IoPoint::new("door", Direction::Input, 1, 3);

        assert_eq!(
            point.snapshot(),
            json!({"isInput": true, "name": "door", "device": 1, "pin": 3, "value": 0})
        );
    }

    #[test]
    fn signal_names_round_trip() {
        for direction in [Direction::Input, Direction::Output] {
            assert_eq!(Direction::from_signal(direction.signal()), Some(direction));
        }
        assert_eq!(Direction::from_signal("available"), None);
    }
}
