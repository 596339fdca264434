//! Topic helpers for the device event bus.
//!
//! Device topics follow `devices/<kind>/<deviceId>/<signalKind>/<pin>`.
//! Subscription filters use MQTT wildcard rules: `+` matches exactly one
//! level and a trailing `#` matches the remaining levels.

/// Root level of every device topic.
pub const DEVICE_ROOT: &str = "devices";

/// Filter matching every device topic.
pub const ALL_DEVICES: &str = "devices/#";

/// Build a device signal topic.
///
/// ```rust
/// use machineapp::bus::io_topic;
///
/// assert_eq!(
///     io_topic("io-expander", 2, "digital-input", 3),
///     "devices/io-expander/2/digital-input/3"
/// );
/// ```
pub fn io_topic(kind: &str, device: u32, signal: &str, pin: u32) -> String {
    format!("{DEVICE_ROOT}/{kind}/{device}/{signal}/{pin}")
}

/// Check whether `topic` is matched by subscription `filter`.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_filters_match_only_themselves() {
        let topic = "devices/io-expander/1/digital-input/0";
        assert!(topic_matches(topic, topic));
        assert!(!topic_matches(topic, "devices/io-expander/1/digital-input/1"));
        assert!(!topic_matches(topic, "devices/io-expander/1/digital-input"));
    }

    #[test]
    fn plus_matches_a_single_level() {
        let filter = "devices/io-expander/+/digital-input/+";
        assert!(topic_matches(filter, "devices/io-expander/4/digital-input/2"));
        assert!(!topic_matches(filter, "devices/io-expander/4/digital-output/2"));
        assert!(!topic_matches(filter, "devices/io-expander/4/digital-input/2/extra"));
    }

    #[test]
    fn hash_matches_the_remaining_levels() {
        assert!(topic_matches(ALL_DEVICES, "devices/io-expander/1/available"));
        assert!(topic_matches(ALL_DEVICES, "devices"));
        assert!(!topic_matches(ALL_DEVICES, "estop/status"));
        assert!(!topic_matches("devices/#/pin", "devices/a/pin"));
    }

    #[test]
    fn io_topic_builds_device_paths() {
        assert_eq!(
            io_topic("io-expander", 1, "digital-output", 3),
            "devices/io-expander/1/digital-output/3"
        );
    }
}
