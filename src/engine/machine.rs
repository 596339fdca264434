//! The state machine engine loop.

use super::app::MachineApp;
use super::control::{Command, EngineHandle, PhaseChange};
use super::error::{EngineError, Hook};
use crate::builder::{BuildError, StateSlot, StateTable};
use crate::config::EngineConfig;
use crate::core::{AppState, StateContext, StateHistory, StateTransition};
use crate::notifier::{NotificationLevel, Notifier};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::thread;
use tracing::{debug, error, info, warn};

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Stopped,
    Estopped,
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub history: StateHistory,
    pub reason: StopReason,
}

/// Stepper mode bookkeeping. A transition request is held once and only
/// proceeds after a resume released that same request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum StepperGate {
    #[default]
    Open,
    Held(String),
    Released(String),
}

impl StepperGate {
    /// Whether a transition to `next` may run now. Otherwise the gate holds
    /// `next` until [`release`](Self::release).
    fn admit(&mut self, next: &str) -> bool {
        match self {
            Self::Released(name) if name == next => {
                *self = Self::Open;
                true
            }
            _ => {
                *self = Self::Held(next.to_string());
                false
            }
        }
    }

    fn release(&mut self) {
        if let Self::Held(name) = self {
            let name = std::mem::take(name);
            *self = Self::Released(name);
        }
    }
}

/// Drives one [`MachineApp`] through its states.
///
/// [`start`](Engine::start) runs the loop on the calling thread until the
/// run is stopped. Control it from other threads through the
/// [`EngineHandle`] returned by [`handle`](Engine::handle).
pub struct Engine<A: MachineApp> {
    app: Mutex<A>,
    notifier: Notifier,
    handle: EngineHandle,
    config: EngineConfig,
}

impl<A: MachineApp> Engine<A> {
    /// Wrap `app` with default loop settings.
    ///
    /// Status events go to `notifier`. A [`Notifier::detached`] notifier has
    /// no drain thread, so its owner must call [`Notifier::drain`] to consume
    /// them; it keeps only the most recent events otherwise.
    pub fn new(app: A, notifier: Notifier) -> Self {
        Self {
            app: Mutex::new(app),
            notifier,
            handle: EngineHandle::default(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Consume the engine and return the application.
    pub fn into_app(self) -> A {
        self.app.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the application until it is stopped or estopped.
    ///
    /// Blocks the calling thread. In stepper mode the engine pauses before
    /// every transition, including the one into the default state, and a
    /// resume lets exactly that transition proceed.
    pub fn start(&self, stepper: bool, configuration: Value) -> Result<RunReport, EngineError> {
        if !self.handle.begin_run() {
            error!("MachineApp is already running");
            return Err(EngineError::AlreadyRunning);
        }

        let _running = RunGuard(&self.handle);

        let mut app = self.app.lock().unwrap_or_else(PoisonError::into_inner);
        let result = self.run(&mut *app, stepper, &configuration);
        if let Err(err) = &result {
            error!("MachineApp run failed: {err}");
        }
        result
    }

    fn run(&self, app: &mut A, stepper: bool, configuration: &Value) -> Result<RunReport, EngineError> {
        self.notifier
            .send_message(NotificationLevel::AppStart, "MachineApp started", None);
        info!(stepper, "Starting the main MachineApp loop");

        app.initialize(configuration)
            .map_err(|source| EngineError::app_hook(Hook::Initialize, source))?;
        let table = app.build_state_table().map_err(|source| {
            match source.downcast::<BuildError>() {
                Ok(build) => EngineError::Build(build),
                Err(source) => EngineError::app_hook(Hook::BuildStateTable, source),
            }
        })?;

        let default_state = app.default_state_name().to_string();
        if !table.contains(&default_state) {
            return Err(EngineError::UnknownDefaultState(default_state));
        }
        self.handle
            .set_known_states(table.names().map(str::to_string));
        self.handle.request_transition(&default_state);

        let mut run = Run {
            handle: &self.handle,
            notifier: &self.notifier,
            configuration,
            table,
            current: None,
            history: StateHistory::with_limit(self.config.history_limit),
            gate: StepperGate::default(),
            stepper,
        };
        let outcome = self.drive(app, &mut run);
        run.release_all();
        let reason = outcome?;

        info!("Exiting MachineApp loop");
        self.notifier
            .send_message(NotificationLevel::AppComplete, "MachineApp completed", None);
        app.after_run()
            .map_err(|source| EngineError::app_hook(Hook::AfterRun, source))?;

        Ok(RunReport {
            history: run.history,
            reason,
        })
    }

    fn drive(&self, app: &mut A, run: &mut Run<'_>) -> Result<StopReason, EngineError> {
        let tick = self.config.tick_interval();
        loop {
            if let Some((command, change)) = self.handle.take_command() {
                match (command, change) {
                    (Command::Estop, PhaseChange::Terminated) => {
                        self.notifier
                            .send_message(NotificationLevel::AppEstop, "MachineApp estopped", None);
                        warn!(state = ?run.current, "MachineApp estopped");
                        app.on_estop()
                            .map_err(|source| EngineError::app_hook(Hook::OnEstop, source))?;
                        return Ok(StopReason::Estopped);
                    }
                    (Command::Stop, PhaseChange::Terminated) => {
                        app.on_stop()
                            .map_err(|source| EngineError::app_hook(Hook::OnStop, source))?;
                        run.call_current(Hook::OnStop, |state, ctx| state.on_stop(ctx))?;
                        return Ok(StopReason::Stopped);
                    }
                    (Command::Pause, PhaseChange::Paused) => {
                        self.notifier
                            .send_message(NotificationLevel::AppPause, "MachineApp paused", None);
                        app.on_pause()
                            .map_err(|source| EngineError::app_hook(Hook::OnPause, source))?;
                        run.call_current(Hook::OnPause, |state, ctx| state.on_pause(ctx))?;
                    }
                    (Command::Resume, PhaseChange::Resumed { after_stepper }) => {
                        self.notifier
                            .send_message(NotificationLevel::AppResume, "MachineApp resumed", None);
                        if after_stepper {
                            run.gate.release();
                        } else {
                            app.on_resume()
                                .map_err(|source| EngineError::app_hook(Hook::OnResume, source))?;
                            run.call_current(Hook::OnResume, |state, ctx| state.on_resume(ctx))?;
                        }
                    }
                    (command, change) => debug!(?command, ?change, "Ignoring command"),
                }
            }

            if self.handle.is_paused() {
                thread::sleep(tick);
                continue;
            }

            if let Some(next) = self.handle.requested_state_name() {
                if run.stepper && !run.gate.admit(&next) {
                    if self.handle.hold_for_stepper() {
                        let message = format!(
                            "Paused for stepper mode: Moving from {} state to {next} state",
                            run.current.as_deref().unwrap_or("None"),
                        );
                        self.notifier
                            .send_message(NotificationLevel::AppPause, message, None);
                    }
                    continue;
                }
                run.transition(&next)?;
                continue;
            }

            match run.current.clone() {
                Some(name) => {
                    run.dispatch(&name);
                    run.call_state(&name, Hook::Update, |state, ctx| state.update(ctx))?;
                }
                None => error!("Currently in an invalid state"),
            }
            thread::sleep(tick);
        }
    }
}

/// Marks the run finished when `start` returns or unwinds.
struct RunGuard<'a>(&'a EngineHandle);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.end_run();
    }
}

/// Per-run state owned by the loop thread.
struct Run<'a> {
    handle: &'a EngineHandle,
    notifier: &'a Notifier,
    configuration: &'a Value,
    table: StateTable,
    current: Option<String>,
    history: StateHistory,
    gate: StepperGate,
    stepper: bool,
}

impl Run<'_> {
    fn call_state<F>(&mut self, name: &str, hook: Hook, call: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut dyn AppState, &mut StateContext<'_>) -> anyhow::Result<()>,
    {
        let Some(StateSlot {
            state,
            subscriptions,
        }) = self.table.slot_mut(name)
        else {
            error!("Trying to retrieve an unknown state: {name}");
            return Ok(());
        };
        let mut ctx = StateContext::new(
            name,
            self.handle,
            self.notifier,
            self.configuration,
            subscriptions,
        );
        call(&mut **state, &mut ctx).map_err(|source| EngineError::state_hook(name, hook, source))
    }

    fn call_current<F>(&mut self, hook: Hook, call: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut dyn AppState, &mut StateContext<'_>) -> anyhow::Result<()>,
    {
        match self.current.clone() {
            Some(name) => self.call_state(&name, hook, call),
            None => Ok(()),
        }
    }

    fn dispatch(&mut self, name: &str) {
        if let Some(slot) = self.table.slot_mut(name) {
            slot.subscriptions.dispatch();
        }
    }

    fn release(&mut self, name: &str) {
        if let Some(slot) = self.table.slot_mut(name) {
            slot.subscriptions.release();
        }
    }

    fn release_all(&mut self) {
        for slot in self.table.slots_mut() {
            slot.subscriptions.release();
        }
    }

    fn transition(&mut self, next: &str) -> Result<(), EngineError> {
        let previous = self.current.clone();
        if let Some(name) = &previous {
            self.call_state(name, Hook::OnLeave, |state, ctx| state.on_leave(ctx))?;
            self.dispatch(name);
            self.release(name);
        }

        self.notifier.send_message(
            NotificationLevel::AppStateChange,
            format!("Entered MachineApp state: {next}"),
            None,
        );
        info!(from = ?previous, to = next, "State transition");
        self.history.record(StateTransition {
            from: previous,
            to: next.to_string(),
            timestamp: Utc::now(),
        });
        self.current = Some(next.to_string());
        self.handle.complete_transition(next);

        self.call_state(next, Hook::OnEnter, |state, ctx| state.on_enter(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_holds_each_request_once() {
        let mut gate = StepperGate::default();

        assert!(!gate.admit("A"));
        assert!(!gate.admit("A"));
        gate.release();
        assert!(gate.admit("A"));
        assert_eq!(gate, StepperGate::Open);
    }

    #[test]
    fn release_applies_only_to_the_held_request() {
        let mut gate = StepperGate::default();

        assert!(!gate.admit("A"));
        gate.release();
        assert!(!gate.admit("B"));
        assert_eq!(gate, StepperGate::Held("B".to_string()));
        gate.release();
        assert!(gate.admit("B"));
    }

    #[test]
    fn release_without_hold_is_a_no_op() {
        let mut gate = StepperGate::default();
        gate.release();

        assert_eq!(gate, StepperGate::Open);
    }
}
