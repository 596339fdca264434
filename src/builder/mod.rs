//! Builder API for ergonomic state table construction.
//!
//! This module provides a fluent builder and a macro for assembling the
//! named states of a machine application, validating names once before the
//! engine runs.

pub mod error;
pub mod macros;
pub mod table;

pub use error::BuildError;
pub use table::{StateTable, StateTableBuilder};
pub(crate) use table::StateSlot;
