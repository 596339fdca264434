//! Cross-thread control block shared by the engine loop and its handles.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

/// Operator command raised from outside the loop thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Estop,
    Stop,
    Pause,
    Resume,
}

impl Command {
    /// Commands in the order the loop consumes them.
    pub const PRIORITY: [Command; 4] = [Self::Estop, Self::Stop, Self::Pause, Self::Resume];
}

/// Pending command flags. Raising a command twice before the loop consumes
/// it has the same effect as raising it once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingCommands {
    estop: bool,
    stop: bool,
    pause: bool,
    resume: bool,
}

impl PendingCommands {
    fn flag(&mut self, command: Command) -> &mut bool {
        match command {
            Command::Estop => &mut self.estop,
            Command::Stop => &mut self.stop,
            Command::Pause => &mut self.pause,
            Command::Resume => &mut self.resume,
        }
    }

    pub fn raise(&mut self, command: Command) {
        *self.flag(command) = true;
    }

    pub fn is_raised(&self, command: Command) -> bool {
        match command {
            Command::Estop => self.estop,
            Command::Stop => self.stop,
            Command::Pause => self.pause,
            Command::Resume => self.resume,
        }
    }

    /// Clear and return the highest-priority raised command.
    pub fn take_next(&mut self) -> Option<Command> {
        let next = Command::PRIORITY
            .into_iter()
            .find(|command| self.is_raised(*command))?;
        *self.flag(next) = false;
        Some(next)
    }

    pub fn is_empty(&self) -> bool {
        Command::PRIORITY
            .into_iter()
            .all(|command| !self.is_raised(command))
    }
}

/// Why the engine is paused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseKind {
    /// Paused by an operator command
    Operator,
    /// Paused automatically before a transition in stepper mode
    Stepper,
}

/// Run lifecycle of the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Paused(PauseKind),
    Stopped,
}

/// Effect of applying a command to a [`RunPhase`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseChange {
    Terminated,
    Paused,
    Resumed { after_stepper: bool },
    Ignored,
}

impl RunPhase {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running | Self::Paused(_))
    }

    pub fn is_paused(self) -> bool {
        matches!(self, Self::Paused(_))
    }

    /// Apply `command` and report what changed.
    ///
    /// Pausing while paused and resuming while not paused are ignored.
    /// Commands never revive an idle or stopped engine.
    pub fn apply(&mut self, command: Command) -> PhaseChange {
        match (*self, command) {
            (Self::Idle | Self::Stopped, _) => PhaseChange::Ignored,
            (_, Command::Estop | Command::Stop) => {
                *self = Self::Stopped;
                PhaseChange::Terminated
            }
            (Self::Running, Command::Pause) => {
                *self = Self::Paused(PauseKind::Operator);
                PhaseChange::Paused
            }
            (Self::Paused(kind), Command::Resume) => {
                *self = Self::Running;
                PhaseChange::Resumed {
                    after_stepper: kind == PauseKind::Stepper,
                }
            }
            _ => PhaseChange::Ignored,
        }
    }
}

#[derive(Debug, Default)]
struct ControlBlock {
    pending: PendingCommands,
    requested: Option<String>,
    known_states: BTreeSet<String>,
    phase: RunPhase,
    current: Option<String>,
}

/// Thread-safe handle for controlling a running engine.
///
/// Every method only records a request; the engine acts on it at its next
/// tick, on its own thread. Cloning yields another handle to the same
/// engine.
#[derive(Clone, Debug, Default)]
pub struct EngineHandle {
    inner: Arc<Mutex<ControlBlock>>,
}

impl EngineHandle {
    fn block(&self) -> MutexGuard<'_, ControlBlock> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn raise(&self, command: Command) {
        self.block().pending.raise(command);
    }

    pub fn pause(&self) {
        info!("Pausing the MachineApp");
        self.raise(Command::Pause);
    }

    pub fn resume(&self) {
        info!("Resuming the MachineApp");
        self.raise(Command::Resume);
    }

    pub fn stop(&self) {
        info!("Stopping the MachineApp");
        self.raise(Command::Stop);
    }

    /// Request an emergency stop. States are not consulted; the integrator's
    /// `on_estop` runs instead.
    pub fn estop(&self) {
        info!("Estopping the MachineApp");
        self.raise(Command::Estop);
    }

    /// Ask the engine to move to `state` at its next loop boundary.
    ///
    /// Returns `false` (and logs) if the current state table has no such
    /// state. A later request replaces an earlier one that has not executed
    /// yet.
    pub fn request_transition(&self, state: &str) -> bool {
        let mut block = self.block();
        if !block.known_states.contains(state) {
            error!("Trying to move to an unknown state: {state}");
            return false;
        }
        block.requested = Some(state.to_string());
        true
    }

    pub fn is_running(&self) -> bool {
        self.block().phase.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.block().phase.is_paused()
    }

    pub fn phase(&self) -> RunPhase {
        self.block().phase
    }

    pub fn current_state_name(&self) -> Option<String> {
        self.block().current.clone()
    }

    pub fn requested_state_name(&self) -> Option<String> {
        self.block().requested.clone()
    }

    /// Names of the states in the current table, sorted.
    pub fn state_names(&self) -> Vec<String> {
        self.block().known_states.iter().cloned().collect()
    }

    /// Replace the set of state names transitions may target.
    pub fn set_known_states<I>(&self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.block().known_states = names.into_iter().collect();
    }

    /// Mark the engine running. Fails if a run is already in progress.
    pub(crate) fn begin_run(&self) -> bool {
        let mut block = self.block();
        if block.phase.is_running() {
            return false;
        }
        *block = ControlBlock {
            phase: RunPhase::Running,
            ..ControlBlock::default()
        };
        true
    }

    pub(crate) fn end_run(&self) {
        let mut block = self.block();
        block.phase = RunPhase::Stopped;
        block.pending = PendingCommands::default();
        block.requested = None;
    }

    /// Consume the highest-priority pending command and apply it to the run
    /// phase in one step.
    pub(crate) fn take_command(&self) -> Option<(Command, PhaseChange)> {
        let mut block = self.block();
        let command = block.pending.take_next()?;
        let change = block.phase.apply(command);
        Some((command, change))
    }

    /// Enter a stepper pause. Returns `false` unless the engine was running
    /// and unpaused.
    pub(crate) fn hold_for_stepper(&self) -> bool {
        let mut block = self.block();
        if block.phase != RunPhase::Running {
            return false;
        }
        block.phase = RunPhase::Paused(PauseKind::Stepper);
        true
    }

    /// Record `state` as current. The pending request is cleared only if it
    /// still names `state`.
    pub(crate) fn complete_transition(&self, state: &str) {
        let mut block = self.block();
        if block.requested.as_deref() == Some(state) {
            block.requested = None;
        }
        block.current = Some(state.to_string());
    }
}
