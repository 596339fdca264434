//! Status events streamed to observers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How an event is presented on the observer side.
///
/// Levels prefixed with `App` describe high-level run state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    AppStart,
    AppComplete,
    AppPause,
    AppResume,
    AppStateChange,
    #[serde(rename = "app_estop_set")]
    AppEstop,
    AppEstopRelease,
    Info,
    Warning,
    Error,
    IoState,
    UiInfo,
}

/// One status line, serialized as
/// `{"timeSeconds", "level", "message", "customPayload"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// Seconds since the Unix epoch
    pub time_seconds: f64,
    pub level: NotificationLevel,
    pub message: String,
    pub custom_payload: Option<Value>,
}

impl StatusEvent {
    /// Create an event stamped with the current time.
    pub fn new(level: NotificationLevel, message: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            time_seconds: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            level,
            message: message.into(),
            custom_payload: payload,
        }
    }

    /// JSON text frame sent to observers.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frame_uses_wire_field_names() {
        let event = StatusEvent::new(
            NotificationLevel::IoState,
            "",
            Some(json!({"name": "clamp", "value": 1})),
        );

        let frame: Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();

        assert_eq!(frame["level"], "io_state");
        assert_eq!(frame["message"], "");
        assert_eq!(frame["customPayload"]["name"], "clamp");
        assert!(frame["timeSeconds"].as_f64().unwrap() > 1_600_000_000.0);
    }

    #[test]
    fn missing_payload_serializes_as_null() {
        let event = StatusEvent::new(NotificationLevel::AppStart, "MachineApp started", None);
        let frame: Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();

        assert!(frame["customPayload"].is_null());
    }

    #[test]
    fn levels_use_wire_names() {
        let names: Vec<String> = [
            NotificationLevel::AppStart,
            NotificationLevel::AppComplete,
            NotificationLevel::AppPause,
            NotificationLevel::AppResume,
            NotificationLevel::AppStateChange,
            NotificationLevel::AppEstop,
            NotificationLevel::AppEstopRelease,
            NotificationLevel::UiInfo,
        ]
        .iter()
        .map(|level| serde_json::to_value(level).unwrap().as_str().unwrap().to_string())
        .collect();

        assert_eq!(
            names,
            vec![
                "app_start",
                "app_complete",
                "app_pause",
                "app_resume",
                "app_state_change",
                "app_estop_set",
                "app_estop_release",
                "ui_info",
            ]
        );
    }
}
