//! State transition history tracking.
//!
//! The engine records every executed transition of a run so that the host
//! layer can report the path a machine took after the run completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single executed state transition.
///
/// `from` is `None` for the transition into the default state at the start
/// of a run.
///
/// # Example
///
/// ```rust
/// use machineapp::core::StateTransition;
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: Some("Idle".to_string()),
///     to: "Homing".to_string(),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.to, "Homing");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being left, if any
    pub from: Option<String>,
    /// The state being entered
    pub to: String,
    /// When the transition executed
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of the transitions executed during one run.
///
/// A history built with [`with_limit`](StateHistory::with_limit) keeps only
/// the most recent transitions; older ones are dropped as new ones arrive.
///
/// # Example
///
/// ```rust
/// use machineapp::core::{StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let mut history = StateHistory::new();
/// history.record(StateTransition {
///     from: None,
///     to: "Idle".to_string(),
///     timestamp: Utc::now(),
/// });
/// history.record(StateTransition {
///     from: Some("Idle".to_string()),
///     to: "Cut".to_string(),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.get_path(), vec!["Idle", "Cut"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: VecDeque<StateTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(default, skip_serializing_if = "is_zero")]
    dropped: u64,
}

fn is_zero(count: &u64) -> bool {
    *count == 0
}

impl StateHistory {
    /// Create a new empty, unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty history that retains at most `limit` transitions.
    /// A limit of zero is treated as one.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// Append an executed transition, dropping the oldest one when the
    /// history is full.
    pub fn record(&mut self, transition: StateTransition) {
        if let Some(limit) = self.limit {
            while self.transitions.len() >= limit {
                self.transitions.pop_front();
                self.dropped += 1;
            }
        }
        self.transitions.push_back(transition);
    }

    /// Maximum number of retained transitions, if bounded.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Number of transitions dropped to stay within the limit.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Get the path of states traversed.
    ///
    /// Starts with the `from` state of the first retained transition when
    /// there is one, followed by the `to` state of every retained transition.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(from) = self.transitions.front().and_then(|t| t.from.as_deref()) {
            path.push(from);
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Calculate total duration from first to last transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Oldest retained transition.
    pub fn first(&self) -> Option<&StateTransition> {
        self.transitions.front()
    }

    /// Most recently executed transition.
    pub fn last(&self) -> Option<&StateTransition> {
        self.transitions.back()
    }

    /// Get all retained transitions in execution order.
    pub fn transitions(&self) -> impl DoubleEndedIterator<Item = &StateTransition> + ExactSizeIterator {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(from: Option<&str>, to: &str) -> StateTransition {
        StateTransition {
            from: from.map(str::to_string),
            to: to.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
        assert!(history.last().is_none());
    }

    #[test]
    fn record_adds_transition() {
        let mut history = StateHistory::new();
        history.record(transition(None, "Idle"));

        assert_eq!(history.len(), 1);
        assert_eq!(history.last().map(|t| t.to.as_str()), Some("Idle"));
    }

    #[test]
    fn path_skips_missing_initial_state() {
        let mut history = StateHistory::new();
        history.record(transition(None, "Idle"));
        history.record(transition(Some("Idle"), "Feed"));
        history.record(transition(Some("Feed"), "Cut"));

        assert_eq!(history.get_path(), vec!["Idle", "Feed", "Cut"]);
    }

    #[test]
    fn path_includes_known_initial_state() {
        let mut history = StateHistory::new();
        history.record(transition(Some("Idle"), "Feed"));

        assert_eq!(history.get_path(), vec!["Idle", "Feed"]);
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let mut history = StateHistory::new();
        history.record(transition(None, "Idle"));

        std::thread::sleep(Duration::from_millis(10));

        history.record(transition(Some("Idle"), "Feed"));

        let duration = history.duration();
        assert!(duration.is_some());
        assert!(duration.unwrap() >= Duration::from_millis(10));
    }

    #[test]
    fn single_transition_has_duration_zero() {
        let mut history = StateHistory::new();
        history.record(transition(None, "Idle"));

        assert_eq!(history.duration(), Some(Duration::from_secs(0)));
    }

    #[test]
    fn limited_history_keeps_the_most_recent_transitions() {
        let mut history = StateHistory::with_limit(3);
        history.record(transition(None, "Idle"));
        for (from, to) in [("Idle", "Pick"), ("Pick", "Place"), ("Place", "Pick"), ("Pick", "Place")] {
            history.record(transition(Some(from), to));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.dropped(), 2);
        assert_eq!(history.first().and_then(|t| t.from.as_deref()), Some("Pick"));
        assert_eq!(history.get_path(), vec!["Pick", "Place", "Pick", "Place"]);
    }

    #[test]
    fn zero_limit_still_keeps_the_last_transition() {
        let mut history = StateHistory::with_limit(0);
        history.record(transition(None, "Idle"));
        history.record(transition(Some("Idle"), "Feed"));

        assert_eq!(history.limit(), Some(1));
        assert_eq!(history.last().map(|t| t.to.as_str()), Some("Feed"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_serializes_correctly() {
        let mut history = StateHistory::new();
        history.record(transition(None, "Idle"));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory = serde_json::from_str(&json).unwrap();

        assert_eq!(history, deserialized);
    }
}
