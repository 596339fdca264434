//! Builder for the name → state table driven by the engine.

use crate::builder::error::BuildError;
use crate::bus::SubscriptionSet;
use crate::core::AppState;
use std::collections::BTreeMap;

/// One state together with the subscriptions it currently owns.
pub(crate) struct StateSlot {
    pub(crate) state: Box<dyn AppState>,
    pub(crate) subscriptions: SubscriptionSet,
}

/// Validated table of uniquely named states.
pub struct StateTable {
    slots: BTreeMap<String, StateSlot>,
}

impl StateTable {
    pub fn builder() -> StateTableBuilder {
        StateTableBuilder::new()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// State names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut StateSlot> {
        self.slots.get_mut(name)
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut StateSlot> {
        self.slots.values_mut()
    }
}

impl std::fmt::Debug for StateTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTable")
            .field("states", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for constructing a [`StateTable`] with a fluent API.
#[derive(Default)]
pub struct StateTableBuilder {
    states: Vec<(String, Box<dyn AppState>)>,
}

impl StateTableBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state under `name`.
    pub fn state(self, name: impl Into<String>, state: impl AppState + 'static) -> Self {
        self.boxed_state(name, Box::new(state))
    }

    /// Add an already boxed state.
    pub fn boxed_state(mut self, name: impl Into<String>, state: Box<dyn AppState>) -> Self {
        self.states.push((name.into(), state));
        self
    }

    /// Build the table.
    /// Returns an error if it is empty or a name is empty or repeated.
    pub fn build(self) -> Result<StateTable, BuildError> {
        if self.states.is_empty() {
            return Err(BuildError::EmptyTable);
        }

        let mut slots = BTreeMap::new();
        for (name, state) in self.states {
            if name.is_empty() {
                return Err(BuildError::EmptyName);
            }
            if slots.contains_key(&name) {
                return Err(BuildError::DuplicateState(name));
            }
            slots.insert(
                name,
                StateSlot {
                    state,
                    subscriptions: SubscriptionSet::new(),
                },
            );
        }

        Ok(StateTable { slots })
    }
}
