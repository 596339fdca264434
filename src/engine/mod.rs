//! State machine execution engine.
//!
//! # Key Concepts
//!
//! - **Engine**: runs one [`MachineApp`] on the thread that calls
//!   [`Engine::start`], one state at a time
//! - **EngineHandle**: thread-safe control surface; pause, resume, stop,
//!   estop and transition requests take effect at the next tick
//! - **Stepper mode**: the engine pauses before every transition until an
//!   operator resumes it
//!
//! Each tick the loop consumes at most one operator command, in priority
//! order estop, stop, pause, resume. While paused no state hook runs.

mod app;
mod control;
mod error;
mod machine;

pub use app::MachineApp;
pub use control::{Command, EngineHandle, PauseKind, PendingCommands, PhaseChange, RunPhase};
pub use error::{EngineError, Hook};
pub use machine::{Engine, RunReport, StopReason};
