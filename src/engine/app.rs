//! The `MachineApp` trait implemented by integrators for a whole machine.

use crate::builder::StateTable;
use serde_json::Value;

/// Run-level behavior of a machine application.
///
/// The engine calls [`initialize`](MachineApp::initialize) and
/// [`build_state_table`](MachineApp::build_state_table) at the start of
/// every run, then enters the state named by
/// [`default_state_name`](MachineApp::default_state_name). The remaining
/// hooks are called on the engine thread when the matching operator command
/// takes effect, before the current state's own hook.
pub trait MachineApp: Send {
    /// Prepare devices and run variables from the run configuration.
    fn initialize(&mut self, _configuration: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    /// Build the states available in this run.
    fn build_state_table(&mut self) -> anyhow::Result<StateTable>;

    /// Name of the state every run begins in.
    fn default_state_name(&self) -> &str;

    /// Called once a run ends normally, whether stopped or estopped.
    fn after_run(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_pause(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_resume(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after an emergency stop. The active state is not consulted;
    /// outputs should be driven to a safe level here.
    fn on_estop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
