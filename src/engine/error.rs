//! Engine error types.

use crate::builder::BuildError;
use std::fmt;
use thiserror::Error;

/// Integrator hook that can fail a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
    Initialize,
    BuildStateTable,
    AfterRun,
    OnEnter,
    OnLeave,
    Update,
    OnPause,
    OnResume,
    OnStop,
    OnEstop,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialize => "initialize",
            Self::BuildStateTable => "build_state_table",
            Self::AfterRun => "after_run",
            Self::OnEnter => "on_enter",
            Self::OnLeave => "on_leave",
            Self::Update => "update",
            Self::OnPause => "on_pause",
            Self::OnResume => "on_resume",
            Self::OnStop => "on_stop",
            Self::OnEstop => "on_estop",
        };
        f.write_str(name)
    }
}

/// Errors that end (or prevent) a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("MachineApp is already running")]
    AlreadyRunning,

    #[error("Default state '{0}' is not in the state table")]
    UnknownDefaultState(String),

    #[error("Invalid state table: {0}")]
    Build(#[from] BuildError),

    #[error("{hook} failed in {scope}: {source}", scope = .state.as_deref().unwrap_or("MachineApp"))]
    Hook {
        /// State whose hook failed, `None` for integrator-level hooks
        state: Option<String>,
        hook: Hook,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    pub(crate) fn app_hook(hook: Hook, source: anyhow::Error) -> Self {
        Self::Hook {
            state: None,
            hook,
            source,
        }
    }

    pub(crate) fn state_hook(state: &str, hook: Hook, source: anyhow::Error) -> Self {
        Self::Hook {
            state: Some(state.to_string()),
            hook,
            source,
        }
    }
}
