//! Machineapp: runtime for stateful machine-control applications
//!
//! Integrators describe each phase of a machine as a named state. The
//! runtime drives the states on a fixed tick, arbitrates pause, resume,
//! stop and estop requests arriving from other threads, relays device bus
//! events into state-scoped callbacks and streams status lines to remote
//! observers over a websocket.
//!
//! # Core Concepts
//!
//! - **AppState**: per-phase behavior (`on_enter`, `update`, `on_leave`, ...)
//! - **MachineApp**: run-level hooks and the table of states
//! - **Engine**: the control loop, steered through an `EngineHandle`
//! - **Notifier**: the status broadcast service
//! - **EventBridge**: per-device subscriptions owned by the active state
//! - **IoMonitor**: mirrors named digital IO points to observers
//!
//! # Example
//!
//! ```rust
//! use machineapp::builder::StateTable;
//! use machineapp::core::{AppState, StateContext};
//! use machineapp::engine::{Engine, MachineApp, StopReason};
//! use machineapp::notifier::Notifier;
//! use serde_json::json;
//!
//! struct Home;
//!
//! impl AppState for Home {
//!     fn on_enter(&mut self, ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
//!         ctx.goto_state("Done");
//!         Ok(())
//!     }
//! }
//!
//! struct Done;
//!
//! impl AppState for Done {
//!     fn on_enter(&mut self, ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
//!         ctx.engine().stop();
//!         Ok(())
//!     }
//! }
//!
//! struct Cell;
//!
//! impl MachineApp for Cell {
//!     fn build_state_table(&mut self) -> anyhow::Result<StateTable> {
//!         Ok(StateTable::builder().state("Home", Home).state("Done", Done).build()?)
//!     }
//!
//!     fn default_state_name(&self) -> &str {
//!         "Home"
//!     }
//! }
//!
//! let engine = Engine::new(Cell, Notifier::detached());
//! let report = engine.start(false, json!({})).unwrap();
//!
//! assert_eq!(report.history.get_path(), vec!["Home", "Done"]);
//! assert_eq!(report.reason, StopReason::Stopped);
//! ```

pub mod builder;
pub mod bus;
pub mod config;
pub mod core;
pub mod engine;
pub mod io;
pub mod notifier;
pub mod observability;

// Re-export commonly used types
pub use builder::{BuildError, StateTable, StateTableBuilder};
pub use config::RuntimeConfig;
pub use core::{AppState, StateContext, StateHistory, StateTransition};
pub use engine::{Engine, EngineError, EngineHandle, MachineApp, RunReport, StopReason};
pub use notifier::{NotificationLevel, Notifier};
