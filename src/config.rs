//! Runtime configuration.
//!
//! Every field has a default, so an empty (or partial) TOML file is a valid
//! configuration:
//!
//! ```toml
//! [engine]
//! tick_interval_ms = 160
//! history_limit = 10000
//!
//! [notifier]
//! bind_addr = "0.0.0.0:8081"
//! drain_interval_ms = 160
//! observer_capacity = 500
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Top-level runtime configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub engine: EngineConfig,
    pub notifier: NotifierSettings,
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine and the notifier cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.notifier.validate()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Engine loop settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of one control loop tick
    pub tick_interval_ms: u64,
    /// Transitions kept in a run's history; older ones are dropped
    pub history_limit: usize,
}

impl EngineConfig {
    /// Tick length, never shorter than one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn with_tick_interval(tick: Duration) -> Self {
        Self {
            tick_interval_ms: tick.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.tick_interval_ms",
                reason: "must be at least 1",
            });
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.history_limit",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 160,
            history_limit: 10_000,
        }
    }
}

/// Status broadcast service settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierSettings {
    /// Address the observer websocket listens on
    pub bind_addr: String,
    /// How often queued status events are fanned out
    pub drain_interval_ms: u64,
    /// Frames buffered per observer before new frames are dropped for it
    pub observer_capacity: usize,
}

impl NotifierSettings {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drain_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "notifier.drain_interval_ms",
                reason: "must be at least 1",
            });
        }
        if self.observer_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "notifier.observer_capacity",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            drain_interval_ms: 160,
            observer_capacity: 500,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
