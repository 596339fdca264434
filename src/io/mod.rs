//! IO state monitoring.
//!
//! An [`IoMonitor`] keeps the last known value of named digital IO points
//! and pushes an IO_STATE status event whenever the device bus reports a
//! change on one of them.

mod monitor;
mod point;

pub use monitor::IoMonitor;
pub use point::{Direction, IoPoint};
