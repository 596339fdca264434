//! Core state machine types.
//!
//! This module contains what integrators implement and what the engine
//! records:
//! - Per-phase behavior via the `AppState` trait
//! - The `StateContext` handed to every hook
//! - Run history tracking

mod context;
mod history;
mod state;

pub use context::StateContext;
pub use history::{StateHistory, StateTransition};
pub use state::AppState;
