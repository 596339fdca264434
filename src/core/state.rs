//! The `AppState` trait implemented by integrators for each phase of a machine.

use super::context::StateContext;

/// Per-phase behavior of a machine application.
///
/// A state is constructed once when the state table is built and then
/// entered, updated and left any number of times during a run. Only
/// [`on_enter`](AppState::on_enter) is required; every other hook defaults
/// to doing nothing.
///
/// Hooks run on the engine thread and may block (for example while waiting
/// for a move to complete). Pause and stop requests take effect at the next
/// tick after the hook returns. An `Err` from any hook aborts the run.
///
/// # Example
///
/// ```rust
/// use machineapp::core::{AppState, StateContext};
///
/// struct Homing;
///
/// impl AppState for Homing {
///     fn on_enter(&mut self, ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
///         // home the axes, then move on
///         ctx.goto_state("Idle");
///         Ok(())
///     }
/// }
/// ```
pub trait AppState: Send {
    /// Called whenever this state is entered.
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) -> anyhow::Result<()>;

    /// Called when transitioning out of this state, before its
    /// subscriptions are released.
    fn on_leave(&mut self, _ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per tick while this state is active and the engine is
    /// not paused.
    fn update(&mut self, _ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when an operator pauses the engine while in this state.
    fn on_pause(&mut self, _ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when an operator resumes the engine while in this state.
    fn on_resume(&mut self, _ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the engine stops while in this state.
    fn on_stop(&mut self, _ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}
