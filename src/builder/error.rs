//! Build errors for state tables.

use thiserror::Error;

/// Errors that can occur when building a state table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("No states defined. Add at least one state with .state(name, state)")]
    EmptyTable,

    #[error("State names must not be empty")]
    EmptyName,

    #[error("State '{0}' is defined more than once")]
    DuplicateState(String),
}
